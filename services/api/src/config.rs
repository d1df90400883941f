use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported LLM providers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    /// Base URL of the provider's OpenAI-compatible API.
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o",
            Provider::Gemini => "gemini-2.0-flash",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Stand-in key used outside production when no key is configured.
pub const PLACEHOLDER_API_KEY: &str = "placeholder-api-key";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub api_key: String,
    /// True when `api_key` is a placeholder rather than a real secret.
    pub api_key_is_placeholder: bool,
    pub chat_model: String,
    pub production: bool,
    /// `EnvFilter` directives, e.g. `info,goal_coach_core=debug`.
    pub log_filter: String,
    pub prompts_path: Option<PathBuf>,
    pub stage_validation: bool,
    pub llm_timeout: Duration,
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("'{}' is not a boolean", value),
        )),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = match std::env::var("BIND_ADDRESS") {
            Ok(address) => address,
            Err(_) => {
                let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
                format!("0.0.0.0:{}", port)
            }
        };
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            "openai" => Provider::OpenAI,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of 'gemini', 'openai'", other),
                ));
            }
        };

        let production = std::env::var("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let (api_key, api_key_is_placeholder) = match std::env::var(provider.key_var()) {
            Ok(key) if !key.trim().is_empty() => (key, false),
            _ if production => {
                return Err(ConfigError::MissingVar(format!(
                    "{} must be set in production",
                    provider.key_var()
                )));
            }
            _ => (PLACEHOLDER_API_KEY.to_string(), true),
        };

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| provider.default_model().to_string());

        let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(&log_filter).map_err(|e| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log filter: {}", log_filter, e),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH").ok().map(PathBuf::from);

        let stage_validation = match std::env::var("STAGE_VALIDATION") {
            Ok(value) => parse_bool("STAGE_VALIDATION", &value)?,
            Err(_) => false,
        };

        let llm_timeout = match std::env::var("LLM_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "LLM_TIMEOUT_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", value),
                    )
                })?,
            Err(_) => Duration::from_secs(60),
        };

        Ok(Self {
            bind_address,
            provider,
            api_key,
            api_key_is_placeholder,
            chat_model,
            production,
            log_filter,
            prompts_path,
            stage_validation,
            llm_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("PORT");
            env::remove_var("LLM_PROVIDER");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("CHAT_MODEL");
            env::remove_var("APP_ENV");
            env::remove_var("RUST_LOG");
            env::remove_var("PROMPTS_PATH");
            env::remove_var("STAGE_VALIDATION");
            env::remove_var("LLM_TIMEOUT_SECS");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal_gemini() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.api_key, "test-gemini-key");
        assert!(!config.api_key_is_placeholder);
        assert_eq!(config.chat_model, "gemini-2.0-flash");
        assert!(!config.production);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.prompts_path, None);
        assert!(!config.stage_validation);
        assert_eq!(config.llm_timeout, Duration::from_secs(60));
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:9000");
            env::set_var("LLM_PROVIDER", "openai");
            env::set_var("OPENAI_API_KEY", "custom-openai-key");
            env::set_var("CHAT_MODEL", "gpt-4o-mini");
            env::set_var("APP_ENV", "production");
            env::set_var("RUST_LOG", "info,goal_coach_core=debug");
            env::set_var("PROMPTS_PATH", "/custom/prompts");
            env::set_var("STAGE_VALIDATION", "true");
            env::set_var("LLM_TIMEOUT_SECS", "15");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:9000");
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.api_key, "custom-openai-key");
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert!(config.production);
        assert_eq!(config.log_filter, "info,goal_coach_core=debug");
        assert_eq!(config.prompts_path, Some(PathBuf::from("/custom/prompts")));
        assert!(config.stage_validation);
        assert_eq!(config.llm_timeout, Duration::from_secs(15));
    }

    #[test]
    #[serial]
    fn test_config_port_fallback() {
        clear_env_vars();
        unsafe {
            env::set_var("PORT", "5000");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:5000");
    }

    #[test]
    #[serial]
    fn test_missing_key_uses_placeholder_outside_production() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.api_key, PLACEHOLDER_API_KEY);
        assert!(config.api_key_is_placeholder);
    }

    #[test]
    #[serial]
    fn test_missing_key_is_fatal_in_production() {
        clear_env_vars();
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("LLM_PROVIDER", "openai");
            env::set_var("GEMINI_API_KEY", "wrong-provider-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            _ => panic!("Expected MissingVar for OPENAI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "llama");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "LLM_PROVIDER"),
            _ => panic!("Expected InvalidValue for LLM_PROVIDER"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_filter() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "goal_coach_core=loud");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_timeout_and_flag() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_TIMEOUT_SECS", "0");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "LLM_TIMEOUT_SECS"),
            _ => panic!("Expected InvalidValue for LLM_TIMEOUT_SECS"),
        }

        clear_env_vars();
        unsafe {
            env::set_var("STAGE_VALIDATION", "sometimes");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "STAGE_VALIDATION"),
            _ => panic!("Expected InvalidValue for STAGE_VALIDATION"),
        }
    }
}
