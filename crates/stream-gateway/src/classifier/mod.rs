//! Frame classification
//!
//! Turns each inbound frame into a data chunk, a control message, or a failure.

mod classify;
mod types;

pub use classify::{classify, Classification, ClassifyError};
pub use types::{ChunkFormat, ControlMessage, DataChunk};
