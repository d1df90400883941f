//! Goal Coach API Library Crate
//!
//! This library contains the web layer of the goal-setting assistant: the
//! configuration, the application state, the API handlers and wire models,
//! and routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
