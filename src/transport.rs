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

// Transport seam: the recorder consumes the pub/sub layer through these
// traits so that any transport (or an in-process test double) can back a
// recording session.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-subscription options understood by every transport.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Bound on buffered-but-undelivered messages per channel. The drop
    /// policy when the bound is exceeded is transport-defined.
    pub pending_queue_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            pending_queue_size: 64,
        }
    }
}

/// A pub/sub transport the recorder can attach to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a named participant on the transport. The recorder derives
    /// the name from a fixed prefix plus its process id so concurrent
    /// recorder instances on one host stay distinguishable.
    async fn create_node(&self, name: &str) -> Result<Arc<dyn TransportNode>>;
}

/// A transport participant able to subscribe to channels.
///
/// The returned receiver is the per-channel delivery context: the
/// transport feeds it in FIFO order, so draining it preserves the
/// channel's arrival order end-to-end.
#[async_trait]
pub trait TransportNode: Send + Sync {
    async fn subscribe(
        &self,
        channel: &str,
        config: SubscriptionConfig,
    ) -> Result<mpsc::Receiver<Bytes>>;

    /// The participant name this node registered with.
    fn name(&self) -> &str;
}
