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

// Recording session orchestrator
//
// Owns the sink, the registry and the topology watcher, and drives the
// Stopped -> Running -> Stopping -> Stopped lifecycle. Delivery tasks
// hold only a Weak reference to the session internals, so callbacks
// firing during or after teardown observe "owner gone" and end instead
// of touching released state.

use crate::channel::{ChannelDescriptor, RecordingScope};
use crate::registry::{ChannelRegistry, Subscription};
use crate::sink::{PendingMessage, SinkError, SinkStats, WriterSink};
use crate::storage::RecordLog;
use crate::topology::{TopologyService, TopologyWatcher};
use crate::transport::{SubscriptionConfig, Transport, TransportNode};
use bytes::Bytes;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Prefix of the transport participant name; the process id is appended
/// so concurrent recorder instances on one host stay distinguishable.
pub const NODE_NAME_PREFIX: &str = "channel_recorder_";

const STATE_STOPPED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;
/// Transitional value guarding concurrent `start` calls; reported as
/// `Stopped` until the start sequence commits.
const STATE_STARTING: u8 = 3;

/// Observable lifecycle state of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Stopped,
    Running,
    Stopping,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recorder is not stopped")]
    AlreadyStarted,
    #[error("recorder is not running")]
    NotRunning,
    #[error("failed to open output log: {0}")]
    OpenSink(#[source] SinkError),
    #[error("failed to create transport node '{name}': {source}")]
    CreateNode {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to establish topology listener: {0}")]
    AttachListener(#[source] anyhow::Error),
}

/// Session options: what to capture and how deep each channel's pending
/// queue is.
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    pub scope: RecordingScope,
    pub pending_queue_size: usize,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            scope: RecordingScope::All,
            pending_queue_size: SubscriptionConfig::default().pending_queue_size,
        }
    }
}

/// One recording session. Single-use: once stopped it cannot be
/// restarted.
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

struct RecorderInner {
    state: AtomicU8,
    scope: RecordingScope,
    pending_queue_size: usize,
    sink: WriterSink,
    registry: ChannelRegistry,
    transport: Arc<dyn Transport>,
    topology: Arc<dyn TopologyService>,
    node: Mutex<Option<Arc<dyn TransportNode>>>,
    watcher: Mutex<Option<TopologyWatcher>>,
    discovery_task: Mutex<Option<JoinHandle<()>>>,
}

impl Recorder {
    pub fn new(
        options: RecorderOptions,
        log: Box<dyn RecordLog>,
        transport: Arc<dyn Transport>,
        topology: Arc<dyn TopologyService>,
    ) -> Self {
        Self {
            inner: Arc::new(RecorderInner {
                state: AtomicU8::new(STATE_STOPPED),
                scope: options.scope,
                pending_queue_size: options.pending_queue_size,
                sink: WriterSink::new(log),
                registry: ChannelRegistry::new(),
                transport,
                topology,
                node: Mutex::new(None),
                watcher: Mutex::new(None),
                discovery_task: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> RecorderState {
        match self.inner.state.load(Ordering::Acquire) {
            STATE_RUNNING => RecorderState::Running,
            STATE_STOPPING => RecorderState::Stopping,
            _ => RecorderState::Stopped,
        }
    }

    pub fn stats(&self) -> SinkStats {
        self.inner.sink.stats()
    }

    /// Number of channels currently registered for capture.
    pub fn recorded_channels(&self) -> usize {
        self.inner.registry.len()
    }

    /// Start the session: open the output log, create the transport
    /// node, catch up on already-known writers, then attach the live
    /// topology listener. Valid only from `Stopped`. On any failure
    /// everything opened so far is released, the output artifact is
    /// removed, and the state returns to `Stopped`.
    pub async fn start(&self) -> Result<(), RecorderError> {
        self.inner
            .state
            .compare_exchange(
                STATE_STOPPED,
                STATE_STARTING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| RecorderError::AlreadyStarted)?;

        if let Err(e) = self.start_impl().await {
            self.inner.teardown(true);
            self.inner.state.store(STATE_STOPPED, Ordering::Release);
            return Err(e);
        }

        self.inner.state.store(STATE_RUNNING, Ordering::Release);
        info!("recording started");
        Ok(())
    }

    async fn start_impl(&self) -> Result<(), RecorderError> {
        let inner = &self.inner;
        inner.sink.open().map_err(RecorderError::OpenSink)?;

        let node_name = format!("{NODE_NAME_PREFIX}{}", std::process::id());
        let node = inner
            .transport
            .create_node(&node_name)
            .await
            .map_err(|source| RecorderError::CreateNode {
                name: node_name.clone(),
                source,
            })?;
        info!(node = %node_name, "transport node created");
        *inner.node.lock().unwrap() = Some(node);

        // catch-up snapshot: writers that appeared before this session
        for descriptor in inner.topology.current_writers().await {
            Arc::clone(inner).discover(descriptor).await;
        }

        let (discoveries_tx, discoveries_rx) = mpsc::unbounded_channel();
        let watcher = TopologyWatcher::attach(inner.topology.clone(), discoveries_tx)
            .map_err(RecorderError::AttachListener)?;
        *inner.watcher.lock().unwrap() = Some(watcher);
        *inner.discovery_task.lock().unwrap() =
            Some(Arc::clone(inner).spawn_discovery_loop(discoveries_rx));
        Ok(())
    }

    /// Stop the session. Valid only from `Running`; re-entrant stops
    /// return an error instead of panicking. The state flag flips first
    /// so in-flight deliveries drop themselves; an append already inside
    /// the sink completes before the log closes (stop drains, it does
    /// not interrupt).
    pub fn stop(&self) -> Result<(), RecorderError> {
        self.inner
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| RecorderError::NotRunning)?;

        self.inner.teardown(false);
        self.inner.state.store(STATE_STOPPED, Ordering::Release);

        let stats = self.inner.sink.stats();
        info!(
            channels = stats.channels,
            messages = stats.messages,
            bytes = stats.bytes,
            "recording stopped"
        );
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // implicit stop for a recorder dropped while running
        if self.stop().is_ok() {
            debug!("recorder stopped implicitly on drop");
        }
    }
}

impl RecorderInner {
    /// Discovery path: validate, filter by scope, deduplicate, register
    /// the schema, subscribe and wire the delivery loop. All failures
    /// here are contained; none abort the session.
    async fn discover(self: Arc<Self>, descriptor: ChannelDescriptor) {
        if let Some(field) = descriptor.missing_field() {
            warn!("discarding discovery event with an empty {field}");
            return;
        }
        let name = descriptor.name.clone();
        if !self.scope.should_capture(&descriptor) {
            debug!(channel = %name, "discovered channel is outside the recording scope");
            return;
        }
        if !self.registry.try_register(&name) {
            debug!(channel = %name, "channel already being recorded");
            return;
        }

        if let Err(e) =
            self.sink
                .register_channel(&name, &descriptor.message_type, &descriptor.schema_descriptor)
        {
            // message appends are still attempted for this channel
            error!(channel = %name, error = %e, "failed to write channel registration");
        }

        let node = self.node.lock().unwrap().clone();
        let Some(node) = node else {
            self.registry.release(&name);
            return;
        };
        let config = SubscriptionConfig {
            pending_queue_size: self.pending_queue_size,
        };
        match node.subscribe(&name, config).await {
            Ok(deliveries) => {
                // teardown may have drained the registry while the
                // subscribe was in flight; activating now would leave a
                // live slot behind the stopped session
                let state = self.state.load(Ordering::Acquire);
                if state != STATE_RUNNING && state != STATE_STARTING {
                    debug!(channel = %name, "session stopped during subscription setup");
                    self.registry.release(&name);
                    return;
                }
                let task = Arc::clone(&self).spawn_delivery_loop(name.clone(), deliveries);
                self.registry.activate(&name, Subscription::new(name.clone(), task));
                info!(channel = %name, "recording channel");
            }
            Err(e) => {
                error!(channel = %name, error = %e, "failed to subscribe to channel");
                self.registry.release(&name);
            }
        }
    }

    fn spawn_discovery_loop(
        self: Arc<Self>,
        mut discoveries: mpsc::UnboundedReceiver<ChannelDescriptor>,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self);
        drop(self);
        tokio::spawn(async move {
            while let Some(descriptor) = discoveries.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.discover(descriptor).await;
            }
        })
    }

    fn spawn_delivery_loop(
        self: Arc<Self>,
        channel: String,
        mut deliveries: mpsc::Receiver<Bytes>,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self);
        drop(self);
        tokio::spawn(async move {
            while let Some(payload) = deliveries.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.on_message(&channel, payload);
            }
        })
    }

    /// Per-message delivery callback. Messages arriving outside the
    /// Running state are dropped quietly; that is the expected race
    /// window between stop's flag-set and in-flight deliveries draining.
    fn on_message(&self, channel: &str, payload: Bytes) {
        if self.state.load(Ordering::Acquire) != STATE_RUNNING {
            debug!(channel, "dropping message: recorder is not running");
            return;
        }
        let message = PendingMessage::now(channel, payload);
        if let Err(e) = self.sink.append(&message) {
            error!(channel, error = %e, "failed to write message");
        }
    }

    /// Common teardown for stop, failed start and drop. Fully
    /// synchronous so `Drop` can run it.
    fn teardown(&self, discard_output: bool) {
        if let Some(mut watcher) = self.watcher.lock().unwrap().take() {
            watcher.detach();
        }
        if let Some(task) = self.discovery_task.lock().unwrap().take() {
            task.abort();
        }
        for subscription in self.registry.drain() {
            debug!(channel = %subscription.channel(), "subscription released");
        }
        if discard_output {
            self.sink.discard();
        } else {
            self.sink.close();
        }
        self.node.lock().unwrap().take();
    }
}
