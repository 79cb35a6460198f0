//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the shared chat state and its synchronization so
//! route handlers can stay focused on protocol translation.

pub mod chatter;
pub mod command;
pub mod message_log;
pub mod notifier;
