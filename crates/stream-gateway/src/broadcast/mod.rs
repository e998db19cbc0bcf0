//! Outbound delivery
//!
//! Addressed delivery to a connection, a session, or every connection.

mod dispatcher;

pub use dispatcher::Dispatcher;
