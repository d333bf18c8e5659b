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

// Topology discovery: role-change events, the topology-service seam and
// the watcher that adapts the raw change stream into channel discoveries.

use crate::channel::ChannelDescriptor;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Role a transport participant plays on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleType {
    Writer,
    Reader,
}

/// A role appearing in the system topology.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub role: RoleType,
    pub descriptor: ChannelDescriptor,
}

/// Handle identifying a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// External topology service the recorder discovers channels through.
#[async_trait]
pub trait TopologyService: Send + Sync {
    /// Snapshot of all currently known writers, used once at startup to
    /// catch up on publishers that existed before the recorder did.
    async fn current_writers(&self) -> Vec<ChannelDescriptor>;

    /// Register a persistent listener for future role changes. Events are
    /// delivered on the given sender until the listener is removed.
    fn add_change_listener(&self, events: mpsc::UnboundedSender<ChangeEvent>)
        -> Result<ListenerId>;

    fn remove_change_listener(&self, id: ListenerId);
}

/// Adapts the topology change stream into channel-discovery events.
///
/// Only writer-role events are forwarded; everything else is discarded
/// without side effects. Detaching removes the listener and stops the
/// forwarding task, and is safe to repeat.
pub struct TopologyWatcher {
    topology: Arc<dyn TopologyService>,
    listener: Option<ListenerId>,
    forward_task: Option<JoinHandle<()>>,
}

impl TopologyWatcher {
    /// Register the change listener and start forwarding writer
    /// descriptors into `discoveries`. Failing to establish the listener
    /// is fatal to the caller's start sequence: without it no future
    /// channel would ever be captured.
    pub fn attach(
        topology: Arc<dyn TopologyService>,
        discoveries: mpsc::UnboundedSender<ChannelDescriptor>,
    ) -> Result<Self> {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let listener = topology.add_change_listener(events_tx)?;
        let forward_task = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if event.role != RoleType::Writer {
                    debug!(role = ?event.role, "ignoring non-writer topology event");
                    continue;
                }
                if discoveries.send(event.descriptor).is_err() {
                    break;
                }
            }
        });
        Ok(Self {
            topology,
            listener: Some(listener),
            forward_task: Some(forward_task),
        })
    }

    /// Remove the listener and stop forwarding. Idempotent.
    pub fn detach(&mut self) {
        if let Some(id) = self.listener.take() {
            self.topology.remove_change_listener(id);
        }
        if let Some(task) = self.forward_task.take() {
            task.abort();
        }
    }
}

impl Drop for TopologyWatcher {
    fn drop(&mut self) {
        self.detach();
    }
}
