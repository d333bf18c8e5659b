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

// Dynamic pub/sub channel recorder
//
// This crate captures messages from a distributed pub/sub system into an
// append-only record log:
// - Discovers publishers at runtime through a topology service, including
//   a one-time catch-up over writers that existed before the session
// - Subscribes once per matching channel and registers its schema in the
//   log before the first message
// - Serializes concurrent per-channel deliveries into a single output
//   stream, preserving per-channel arrival order
// - Stops cleanly: discovery detaches, in-flight callbacks drain, and
//   the log closes exactly once

pub mod bus;
pub mod channel;
pub mod config;
pub mod recorder;
pub mod registry;
pub mod sink;
pub mod storage;
pub mod topology;
pub mod transport;

// Re-export main types
pub use bus::{BusPublisher, InProcessBus};
pub use channel::{ChannelDescriptor, RecordingScope};
pub use config::{load_config, load_config_with_env, RecorderConfig};
pub use recorder::{Recorder, RecorderError, RecorderOptions, RecorderState, NODE_NAME_PREFIX};
pub use registry::{ChannelRegistry, Subscription};
pub use sink::{PendingMessage, SinkError, SinkStats, WriterSink};
pub use storage::{FileRecordLog, LogFactory, MemoryLog, Record, RecordLog};
pub use topology::{ChangeEvent, ListenerId, RoleType, TopologyService, TopologyWatcher};
pub use transport::{SubscriptionConfig, Transport, TransportNode};
