//! Real-time broadcast chat log.
//!
//! ARCHITECTURE
//! ============
//! - `services::message_log`: the shared ordered log and its change signal
//! - `services::notifier`: streaming subscribers that re-read on change
//! - `services::chatter`: per-identity display name and color
//! - `services::command`: slash-command parsing, rendering, and dispatch
//! - `routes`: HTTP glue (submit, poll, SSE stream, static assets)

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
