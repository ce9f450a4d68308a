//! Telegram transport.
//!
//! Connects the bot account over `MTProto`, turns updates into inbound
//! events, performs outbound effects with rate limiting and answers
//! channel membership queries.

mod client;
mod convert;
mod members;
mod rate_limiter;

pub use client::{ReplyTarget, TelegramBot, TransportError};
pub use grammers_client::update::Update;
pub use rate_limiter::RateLimiter;
