// Copyright 2026 channel-recorder contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Serialized front-end over the record log
//
// Every channel delivery context appends through this sink; the mutex
// is the single point of mutual exclusion that keeps records from
// interleaving their bytes. Per-channel order is therefore the caller's
// arrival order, while cross-channel interleaving stays unspecified.

use crate::storage::RecordLog;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink is closed")]
    Closed,
    #[error("sink is already open")]
    AlreadyOpen,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A message captured from a channel, alive only between callback entry
/// and the append that persists it.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub channel: String,
    pub payload: Bytes,
    /// Local receipt time in nanoseconds, not the original publish time.
    pub received_ns: u64,
}

impl PendingMessage {
    /// Stamp a payload with the current receipt time.
    pub fn now(channel: impl Into<String>, payload: Bytes) -> Self {
        let received_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64;
        Self {
            channel: channel.into(),
            payload,
            received_ns,
        }
    }
}

/// Counters accumulated over a session; they survive `close`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub channels: u64,
    pub messages: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Open,
    Closed,
}

struct SinkInner {
    log: Box<dyn RecordLog>,
    state: State,
    /// Channels whose schema registration already reached the log.
    registered: HashSet<String>,
}

/// Owns the durable output log for one recording session.
pub struct WriterSink {
    inner: Mutex<SinkInner>,
    channels_written: AtomicU64,
    messages_written: AtomicU64,
    bytes_written: AtomicU64,
}

impl WriterSink {
    pub fn new(log: Box<dyn RecordLog>) -> Self {
        Self {
            inner: Mutex::new(SinkInner {
                log,
                state: State::Fresh,
                registered: HashSet::new(),
            }),
            channels_written: AtomicU64::new(0),
            messages_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        }
    }

    /// Acquire the output log. A sink is single-use: opening twice, or
    /// after `close`, fails.
    pub fn open(&self) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::Open => return Err(SinkError::AlreadyOpen),
            State::Closed => return Err(SinkError::Closed),
            State::Fresh => {}
        }
        inner.log.open()?;
        inner.state = State::Open;
        Ok(())
    }

    /// Write the schema registration for a channel. The first call per
    /// channel reaches the log; repeats are tolerated no-ops, so readers
    /// never see duplicate schema entries.
    pub fn register_channel(
        &self,
        name: &str,
        message_type: &str,
        schema_descriptor: &[u8],
    ) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != State::Open {
            return Err(SinkError::Closed);
        }
        if !inner.registered.insert(name.to_string()) {
            debug!(channel = name, "schema already registered");
            return Ok(());
        }
        if let Err(e) = inner.log.write_channel(name, message_type, schema_descriptor) {
            // forget the registration so a later discovery can retry it
            inner.registered.remove(name);
            return Err(e.into());
        }
        drop(inner);
        self.channels_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Append one message record. Safe to call concurrently from many
    /// delivery contexts; a failed append leaves the sink usable.
    pub fn append(&self, message: &PendingMessage) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != State::Open {
            return Err(SinkError::Closed);
        }
        inner
            .log
            .write_message(&message.channel, &message.payload, message.received_ns)?;
        drop(inner);
        self.messages_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(message.payload.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Flush and release the log. Idempotent; appends after this fail
    /// with [`SinkError::Closed`].
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == State::Open {
            if let Err(e) = inner.log.close() {
                error!(error = %e, "failed to close record log");
            }
        }
        inner.state = State::Closed;
    }

    /// Abandon the session: close the log and remove whatever it
    /// created. Used when a start sequence fails partway.
    pub fn discard(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != State::Closed {
            if let Err(e) = inner.log.discard() {
                error!(error = %e, "failed to discard record log");
            }
        }
        inner.state = State::Closed;
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            channels: self.channels_written.load(Ordering::Relaxed),
            messages: self.messages_written.load(Ordering::Relaxed),
            bytes: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}
