//! Inbound event handling.
//!
//! Classifies platform messages into [`InboundEvent`]s and routes them
//! through the [`Dispatcher`], which answers with [`Outbound`] effects.

mod handler;
pub mod messages;
mod types;

pub use handler::{Dispatcher, Route, route_for};
pub use types::{
    AdminCommand, Button, DocumentFetcher, FetchError, InboundEvent, IncomingDocument, Markup, Outbound,
    PANEL_DELETE, PANEL_PROMO, PANEL_STATUS, PANEL_UPLOAD, PANEL_USER_COUNT, PROMO_COMMAND, is_broadcast_trigger,
    is_identifier,
};
