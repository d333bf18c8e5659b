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

// In-process pub/sub bus implementing both collaborator seams
//
// Backs the demo binary and the integration tests with a real, concurrent
// transport plus topology service in a single process. Advertising a
// writer emits a Writer change event; creating a subscription emits a
// Reader event, which discovery must ignore.

use crate::channel::ChannelDescriptor;
use crate::topology::{ChangeEvent, ListenerId, RoleType, TopologyService};
use crate::transport::{SubscriptionConfig, Transport, TransportNode};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Default)]
struct ChannelState {
    descriptor: Option<ChannelDescriptor>,
    subscribers: Vec<mpsc::Sender<Bytes>>,
}

#[derive(Default)]
struct BusInner {
    channels: DashMap<String, ChannelState>,
    listeners: DashMap<u64, mpsc::UnboundedSender<ChangeEvent>>,
    next_listener_id: AtomicU64,
}

impl BusInner {
    fn emit(&self, event: ChangeEvent) {
        self.listeners.retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

/// Cheaply cloneable in-process bus; clones share all state.
#[derive(Clone, Default)]
pub struct InProcessBus {
    inner: Arc<BusInner>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a writer for the descriptor's channel and announce it to
    /// topology listeners. Re-advertising the same channel emits another
    /// event without disturbing existing subscribers.
    pub fn advertise(&self, descriptor: ChannelDescriptor) -> BusPublisher {
        let name = descriptor.name.clone();
        self.inner
            .channels
            .entry(name.clone())
            .or_default()
            .descriptor = Some(descriptor.clone());
        self.inner.emit(ChangeEvent {
            role: RoleType::Writer,
            descriptor,
        });
        BusPublisher {
            inner: self.inner.clone(),
            channel: name,
        }
    }
}

/// Publishing side of one bus channel.
pub struct BusPublisher {
    inner: Arc<BusInner>,
    channel: String,
}

impl BusPublisher {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Fan the payload out to every subscriber. A subscriber whose
    /// pending queue is full loses this message; a disconnected
    /// subscriber is pruned.
    pub fn publish(&self, payload: impl Into<Bytes>) {
        let payload = payload.into();
        if let Some(mut state) = self.inner.channels.get_mut(&self.channel) {
            state.subscribers.retain(|tx| match tx.try_send(payload.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(channel = %self.channel, "subscriber queue full, dropping message");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        }
    }
}

struct BusNode {
    inner: Arc<BusInner>,
    name: String,
}

#[async_trait]
impl Transport for InProcessBus {
    async fn create_node(&self, name: &str) -> Result<Arc<dyn TransportNode>> {
        Ok(Arc::new(BusNode {
            inner: self.inner.clone(),
            name: name.to_string(),
        }))
    }
}

#[async_trait]
impl TransportNode for BusNode {
    async fn subscribe(
        &self,
        channel: &str,
        config: SubscriptionConfig,
    ) -> Result<mpsc::Receiver<Bytes>> {
        let (tx, rx) = mpsc::channel(config.pending_queue_size.max(1));
        let descriptor = {
            let mut state = self.inner.channels.entry(channel.to_string()).or_default();
            state.subscribers.push(tx);
            state.descriptor.clone()
        };
        if let Some(descriptor) = descriptor {
            self.inner.emit(ChangeEvent {
                role: RoleType::Reader,
                descriptor,
            });
        }
        Ok(rx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl TopologyService for InProcessBus {
    async fn current_writers(&self) -> Vec<ChannelDescriptor> {
        self.inner
            .channels
            .iter()
            .filter_map(|entry| entry.value().descriptor.clone())
            .collect()
    }

    fn add_change_listener(
        &self,
        events: mpsc::UnboundedSender<ChangeEvent>,
    ) -> Result<ListenerId> {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, events);
        Ok(ListenerId(id))
    }

    fn remove_change_listener(&self, id: ListenerId) {
        self.inner.listeners.remove(&id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ChannelDescriptor {
        ChannelDescriptor::new(name, "demo.Msg", b"schema".to_vec())
    }

    #[tokio::test]
    async fn test_advertise_notifies_listeners() {
        let bus = InProcessBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.add_change_listener(tx).unwrap();

        bus.advertise(descriptor("chassis"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.role, RoleType::Writer);
        assert_eq!(event.descriptor.name, "chassis");
    }

    #[tokio::test]
    async fn test_current_writers_snapshot() {
        let bus = InProcessBus::new();
        bus.advertise(descriptor("a"));
        bus.advertise(descriptor("b"));

        let mut names: Vec<String> = bus
            .current_writers()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_publish_delivers_in_order() {
        let bus = InProcessBus::new();
        let publisher = bus.advertise(descriptor("chassis"));
        let node = bus.create_node("test_node").await.unwrap();
        let mut rx = node
            .subscribe("chassis", SubscriptionConfig::default())
            .await
            .unwrap();

        for i in 0..5u8 {
            publisher.publish(vec![i]);
        }
        for i in 0..5u8 {
            assert_eq!(rx.recv().await.unwrap(), Bytes::from(vec![i]));
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_newest() {
        let bus = InProcessBus::new();
        let publisher = bus.advertise(descriptor("chassis"));
        let node = bus.create_node("test_node").await.unwrap();
        let mut rx = node
            .subscribe(
                "chassis",
                SubscriptionConfig {
                    pending_queue_size: 2,
                },
            )
            .await
            .unwrap();

        for i in 0..5u8 {
            publisher.publish(vec![i]);
        }
        assert_eq!(rx.recv().await.unwrap(), Bytes::from(vec![0u8]));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from(vec![1u8]));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_emits_reader_event() {
        let bus = InProcessBus::new();
        bus.advertise(descriptor("chassis"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.add_change_listener(tx).unwrap();

        let node = bus.create_node("test_node").await.unwrap();
        let _sub = node
            .subscribe("chassis", SubscriptionConfig::default())
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.role, RoleType::Reader);
    }

    #[tokio::test]
    async fn test_removed_listener_gets_nothing() {
        let bus = InProcessBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = bus.add_change_listener(tx).unwrap();
        bus.remove_change_listener(id);

        bus.advertise(descriptor("chassis"));
        assert!(rx.try_recv().is_err());
    }
}
