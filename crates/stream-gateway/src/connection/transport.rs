//! Transport handle
//!
//! The send/close capability of one connection. The socket writer task owns the
//! matching [`TransportReceiver`] and drains it onto the wire.

use crate::protocol::{CloseFrame, OutboundFrame};
use tokio::sync::{mpsc, watch};

/// A pending close and whether queued frames are flushed first
#[derive(Debug, Clone)]
struct CloseRequest {
    frame: CloseFrame,
    drain: bool,
}

/// Sending half of a connection's outbound queue
#[derive(Debug)]
pub struct Transport {
    frames: mpsc::Sender<OutboundFrame>,
    close: watch::Sender<Option<CloseRequest>>,
}

/// Receiving half, drained by the socket writer
#[derive(Debug)]
pub struct TransportReceiver {
    frames: mpsc::Receiver<OutboundFrame>,
    close: watch::Receiver<Option<CloseRequest>>,
    finished: bool,
}

/// Item yielded to the socket writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write this frame
    Frame(OutboundFrame),
    /// Write a close frame and stop
    Close(CloseFrame),
}

impl Transport {
    /// Create a transport with a bounded outbound queue
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, TransportReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (close_tx, close_rx) = watch::channel(None);

        (
            Self {
                frames: tx,
                close: close_tx,
            },
            TransportReceiver {
                frames: rx,
                close: close_rx,
                finished: false,
            },
        )
    }

    /// Queue a frame without waiting
    ///
    /// Returns `false` if the transport is closed or its queue is full.
    pub fn try_send(&self, frame: OutboundFrame) -> bool {
        if self.is_closed() {
            return false;
        }
        self.frames.try_send(frame).is_ok()
    }

    /// Request a graceful close: queued frames go out before `frame`
    ///
    /// Only the first request wins; later calls return `false`.
    pub fn close(&self, frame: CloseFrame) -> bool {
        self.close.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(CloseRequest { frame, drain: true });
            true
        })
    }

    /// Request a forced close: queued frames are discarded
    ///
    /// Overrides a pending graceful close. Returns `false` if a forced close
    /// was already requested.
    pub fn terminate(&self, frame: CloseFrame) -> bool {
        self.close.send_if_modified(|slot| {
            if matches!(slot, Some(request) if !request.drain) {
                return false;
            }
            *slot = Some(CloseRequest { frame, drain: false });
            true
        })
    }

    /// Close requested, or the writer side is gone
    pub fn is_closed(&self) -> bool {
        self.close.borrow().is_some() || self.frames.is_closed()
    }

    /// The close frame requested on this transport, if any
    pub fn close_frame(&self) -> Option<CloseFrame> {
        self.close.borrow().as_ref().map(|request| request.frame.clone())
    }

    /// Resolves with the close frame once a close is requested
    pub async fn closed(&self) -> Option<CloseFrame> {
        let mut close = self.close.subscribe();
        let request = close.wait_for(Option::is_some).await.ok()?;
        request.as_ref().map(|request| request.frame.clone())
    }
}

impl TransportReceiver {
    /// Next item for the writer
    ///
    /// After a graceful close, frames queued before it are yielded first; a
    /// forced close is yielded at once. Returns `None` once the close frame
    /// has been yielded or every sender is gone.
    pub async fn recv(&mut self) -> Option<Outbound> {
        if self.finished {
            return None;
        }

        let forced = self
            .close
            .borrow()
            .as_ref()
            .filter(|request| !request.drain)
            .map(|request| request.frame.clone());
        if let Some(frame) = forced {
            self.finished = true;
            return Some(Outbound::Close(frame));
        }

        let item = tokio::select! {
            biased;
            frame = self.frames.recv() => frame.map(Outbound::Frame),
            request = self.close.wait_for(Option::is_some) => {
                request
                    .ok()
                    .and_then(|request| request.as_ref().map(|r| r.frame.clone()))
                    .map(Outbound::Close)
            }
        };

        if !matches!(item, Some(Outbound::Frame(_))) {
            self.finished = true;
        }
        item
    }
}
