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

/// Recorder state machine tests: start/stop transitions, re-entrancy
/// misuse, fatal-to-start failures and implicit stop on drop
///
use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use channel_recorder::{
    ChangeEvent, ChannelDescriptor, FileRecordLog, InProcessBus, ListenerId, MemoryLog, Recorder,
    RecorderError, RecorderOptions, RecorderState, RecordingScope, SubscriptionConfig,
    TopologyService, Transport, TransportNode,
};

fn descriptor(name: &str) -> ChannelDescriptor {
    ChannelDescriptor::new(name, "demo.Msg", b"schema".to_vec())
}

fn memory_recorder(bus: &InProcessBus) -> (Recorder, MemoryLog) {
    let log = MemoryLog::new();
    let recorder = Recorder::new(
        RecorderOptions {
            scope: RecordingScope::All,
            pending_queue_size: 64,
        },
        Box::new(log.clone()),
        Arc::new(bus.clone()),
        Arc::new(bus.clone()),
    );
    (recorder, log)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_transitions() {
    let bus = InProcessBus::new();
    let (recorder, _log) = memory_recorder(&bus);

    assert_eq!(recorder.state(), RecorderState::Stopped);
    recorder.start().await.unwrap();
    assert_eq!(recorder.state(), RecorderState::Running);
    recorder.stop().unwrap();
    assert_eq!(recorder.state(), RecorderState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_twice_fails() {
    let bus = InProcessBus::new();
    let (recorder, _log) = memory_recorder(&bus);

    recorder.start().await.unwrap();
    assert!(matches!(
        recorder.start().await,
        Err(RecorderError::AlreadyStarted)
    ));
    assert_eq!(recorder.state(), RecorderState::Running);
    recorder.stop().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_without_start_fails() {
    let bus = InProcessBus::new();
    let (recorder, _log) = memory_recorder(&bus);

    assert!(matches!(recorder.stop(), Err(RecorderError::NotRunning)));
    assert_eq!(recorder.state(), RecorderState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_double_stop_second_call_fails() {
    let bus = InProcessBus::new();
    let (recorder, _log) = memory_recorder(&bus);

    recorder.start().await.unwrap();
    recorder.stop().unwrap();
    assert!(matches!(recorder.stop(), Err(RecorderError::NotRunning)));
    assert_eq!(recorder.state(), RecorderState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_is_single_use() {
    let bus = InProcessBus::new();
    let (recorder, _log) = memory_recorder(&bus);

    recorder.start().await.unwrap();
    recorder.stop().unwrap();
    // the sink is closed for good, so a second session must not start
    assert!(recorder.start().await.is_err());
    assert_eq!(recorder.state(), RecorderState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_open_failure_leaves_stopped_state() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("occupied.rlog");
    std::fs::write(&path, b"existing file").unwrap();

    let bus = InProcessBus::new();
    let recorder = Recorder::new(
        RecorderOptions::default(),
        Box::new(FileRecordLog::new(&path)),
        Arc::new(bus.clone()),
        Arc::new(bus.clone()),
    );

    assert!(matches!(
        recorder.start().await,
        Err(RecorderError::OpenSink(_))
    ));
    assert_eq!(recorder.state(), RecorderState::Stopped);
    // the pre-existing file is untouched
    assert_eq!(std::fs::read(&path).unwrap(), b"existing file");
}

/// Topology double whose listener registration always fails.
struct DeafTopology;

#[async_trait]
impl TopologyService for DeafTopology {
    async fn current_writers(&self) -> Vec<ChannelDescriptor> {
        vec![ChannelDescriptor::new(
            "chassis",
            "demo.Msg",
            b"schema".to_vec(),
        )]
    }

    fn add_change_listener(
        &self,
        _events: mpsc::UnboundedSender<ChangeEvent>,
    ) -> Result<ListenerId> {
        bail!("listener endpoint unavailable")
    }

    fn remove_change_listener(&self, _id: ListenerId) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_listener_failure_aborts_start_and_removes_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("session.rlog");

    let bus = InProcessBus::new();
    let recorder = Recorder::new(
        RecorderOptions::default(),
        Box::new(FileRecordLog::new(&path)),
        Arc::new(bus.clone()),
        Arc::new(DeafTopology),
    );

    assert!(matches!(
        recorder.start().await,
        Err(RecorderError::AttachListener(_))
    ));
    assert_eq!(recorder.state(), RecorderState::Stopped);
    // no subscriptions survive and the partial output log was removed
    assert_eq!(recorder.recorded_channels(), 0);
    assert!(!path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drop_while_running_performs_implicit_stop() {
    let bus = InProcessBus::new();
    let (recorder, log) = memory_recorder(&bus);
    recorder.start().await.unwrap();

    let publisher = bus.advertise(descriptor("chassis"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    publisher.publish(&b"payload"[..]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let written = log.len();
    assert!(written >= 1);

    drop(recorder);

    // the dropped recorder's subscriptions are gone; late publishes
    // reach nobody
    publisher.publish(&b"late"[..]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(log.len(), written);
}

/// Transport whose subscribe stalls its thread without yielding, so a
/// concurrent stop completes while the subscription setup is still in
/// flight.
struct StallingTransport {
    stall: Duration,
}

#[async_trait]
impl Transport for StallingTransport {
    async fn create_node(&self, _name: &str) -> Result<Arc<dyn TransportNode>> {
        Ok(Arc::new(StallingNode { stall: self.stall }))
    }
}

struct StallingNode {
    stall: Duration,
}

#[async_trait]
impl TransportNode for StallingNode {
    async fn subscribe(
        &self,
        _channel: &str,
        _config: SubscriptionConfig,
    ) -> Result<mpsc::Receiver<Bytes>> {
        std::thread::sleep(self.stall);
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    fn name(&self) -> &str {
        "stalling_node"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_during_subscription_setup_leaves_no_slot() {
    let bus = InProcessBus::new();
    let log = MemoryLog::new();
    let recorder = Recorder::new(
        RecorderOptions::default(),
        Box::new(log.clone()),
        Arc::new(StallingTransport {
            stall: Duration::from_millis(200),
        }),
        Arc::new(bus.clone()),
    );
    recorder.start().await.unwrap();

    // discovery parks inside the subscribe
    bus.advertise(ChannelDescriptor::new("chassis", "demo.Msg", b"schema".to_vec()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    recorder.stop().unwrap();

    // the subscribe finishes after teardown drained the registry; no
    // slot may reappear behind the stopped session
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(recorder.recorded_channels(), 0);
    assert_eq!(recorder.state(), RecorderState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stats_reflect_session() {
    let bus = InProcessBus::new();
    let (recorder, _log) = memory_recorder(&bus);
    recorder.start().await.unwrap();

    let publisher = bus.advertise(descriptor("chassis"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    for _ in 0..4 {
        publisher.publish(&b"12345"[..]);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    recorder.stop().unwrap();

    let stats = recorder.stats();
    assert_eq!(stats.channels, 1);
    assert_eq!(stats.messages, 4);
    assert_eq!(stats.bytes, 20);
}
