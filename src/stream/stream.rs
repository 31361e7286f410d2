use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, warn};

use super::receipt::{Completer, Receipt, receipt};
use crate::array::Array;
use crate::tensor::Tensor;
use crate::utils::error::{PaginatedError, Result};

/// Units that may wait in the channel beyond the one being processed.
const CHANNEL_DEPTH: usize = 1;

enum Message {
    Data { data: Array, completer: Completer },
    Finalize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Open,
    Closed,
}

/// Returned when a stream cannot be opened; hands the tensor back.
#[derive(Error)]
#[error("{error}")]
pub struct StreamOpenError {
    #[source]
    error: PaginatedError,
    tensor: Tensor,
}

impl StreamOpenError {
    pub fn error(&self) -> &PaginatedError {
        &self.error
    }

    pub fn into_tensor(self) -> Tensor {
        self.tensor
    }
}

impl fmt::Debug for StreamOpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOpenError")
            .field("error", &self.error)
            .field("tensor", &self.tensor)
            .finish()
    }
}

/// Cloneable producer handle. Every clone feeds the same actor, in the order
/// the channel accepts units.
#[derive(Clone)]
pub struct StreamSender {
    sender: SyncSender<Message>,
    closed: Arc<AtomicBool>,
}

impl StreamSender {
    /// Queue one unit, blocking until the channel accepts it.
    ///
    /// Fails with [`PaginatedError::StreamClosed`] once the stream is finalized.
    pub fn send(&self, data: Array) -> Result<Receipt> {
        if self.is_closed() {
            return Err(PaginatedError::StreamClosed);
        }

        let (receipt, completer) = receipt();
        self.sender
            .send(Message::Data { data, completer })
            .map_err(|_| PaginatedError::StreamClosed)?;
        Ok(receipt)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Single-writer ingestion session over one tensor.
///
/// The actor thread owns the tensor until [`Stream::finalize`] hands it back.
pub struct Stream {
    sender: Option<StreamSender>,
    actor: Option<JoinHandle<Tensor>>,
    mutable: Vec<bool>,
}

impl Tensor {
    /// Start an ingestion actor over this tensor. `mutable` needs one entry per
    /// dimension.
    pub fn stream(self, mutable: &[bool]) -> std::result::Result<Stream, StreamOpenError> {
        if mutable.len() != self.ndim() {
            return Err(StreamOpenError {
                error: PaginatedError::Size {
                    expected: self.ndim(),
                    got: mutable.len(),
                },
                tensor: self,
            });
        }

        let (sender, receiver) = sync_channel(CHANNEL_DEPTH);
        let closed = Arc::new(AtomicBool::new(false));

        let actor_closed = Arc::clone(&closed);
        let actor = thread::spawn(move || Stream::run(self, receiver, actor_closed));
        debug!(dims = mutable.len(), "stream opened");

        Ok(Stream {
            sender: Some(StreamSender { sender, closed }),
            actor: Some(actor),
            mutable: mutable.to_vec(),
        })
    }
}

impl Stream {
    fn run(mut tensor: Tensor, receiver: Receiver<Message>, closed: Arc<AtomicBool>) -> Tensor {
        let mut units = 0usize;

        while let Ok(message) = receiver.recv() {
            match message {
                Message::Data { data, completer } => {
                    let result = tensor.add_data(&data);
                    if let Err(e) = &result {
                        warn!(unit = units, len = data.len(), error = %e, "ingestion unit failed");
                    }
                    units += 1;
                    completer.complete(result);
                }
                Message::Finalize => break,
            }
        }

        // units still queued are dropped with the receiver and resolve as closed
        closed.store(true, Ordering::Release);
        debug!(units, written = tensor.written(), "stream closed");
        tensor
    }

    /// Queue one unit, blocking while another unit is already waiting.
    pub fn send(&self, data: Array) -> Result<Receipt> {
        match &self.sender {
            Some(sender) => sender.send(data),
            None => Err(PaginatedError::StreamClosed),
        }
    }

    /// Another producer handle for this stream.
    pub fn sender(&self) -> Option<StreamSender> {
        self.sender.clone()
    }

    pub fn state(&self) -> StreamState {
        match &self.sender {
            Some(sender) if !sender.is_closed() => StreamState::Open,
            _ => StreamState::Closed,
        }
    }

    pub fn mutable(&self) -> &[bool] {
        &self.mutable
    }

    /// Close the stream and take the tensor back.
    ///
    /// Units queued before this call are processed first. Call it only once
    /// every intended `send` has returned; units racing with it from other
    /// producers may be rejected.
    pub fn finalize(mut self) -> Result<Tensor> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<Tensor> {
        if let Some(sender) = self.sender.take() {
            // fails only if the actor is already gone; join reports why
            let _ = sender.sender.send(Message::Finalize);
        }

        let actor = self.actor.take().ok_or(PaginatedError::StreamClosed)?;
        actor.join().map_err(|_| PaginatedError::ActorPanicked)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if self.actor.is_some() {
            let _ = self.shutdown();
        }
    }
}
