//! Gated Lookup Bot Library
//!
//! A Telegram bot that answers ID lookups from an admin-uploaded
//! spreadsheet, for users subscribed to a fixed set of channels.
//!
//! This crate provides the core functionality for:
//! - Checking channel membership and gating every interaction on it
//! - Parsing `.xlsx` uploads and swapping the active dataset atomically
//! - Routing inbound events and rendering lookup results
//! - Connecting to Telegram via `MTProto`

pub mod broadcast;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod gate;
pub mod registry;
pub mod render;
pub mod telegram;
mod user;

pub use user::{UserId, UserProfile};
