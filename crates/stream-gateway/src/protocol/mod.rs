//! Gateway protocol definitions
//!
//! Defines frame shapes, server-originated messages, and close codes.

mod close_codes;
mod frames;
mod messages;

pub use close_codes::{CloseCode, CloseFrame};
pub use frames::{InboundFrame, OutboundFrame, Payload};
pub use messages::ServerMessage;
