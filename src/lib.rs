//! Draft-and-sync client for AI model provider configuration.
//!
//! A remote service owns the durable configuration: which provider and model
//! serve the chat, completion, and embedding roles, per-model field values,
//! API keys, and a send-with-shift-enter input preference. This crate keeps
//! an editable draft of that document, diffs it down to a minimal patch, and
//! submits the patch under optimistic concurrency. The [`settings`] module is
//! the core; [`client`] is the HTTP boundary it talks through.

pub mod catalog;
pub mod client;
pub mod config;
pub mod logging;
pub mod models;
pub mod settings;
