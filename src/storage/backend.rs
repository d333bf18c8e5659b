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

// Record log trait for write-only recording

use anyhow::Result;

/// Append-only output log for one recording session.
///
/// Two record kinds exist: a per-channel schema registration and a
/// timestamped message payload. Implementations are not required to be
/// thread-safe; `WriterSink` serializes all access behind its own mutex,
/// so calls never overlap.
///
/// Read/replay operations are deliberately not part of this trait.
pub trait RecordLog: Send {
    /// Acquire the output resource. Fails if already open or if the
    /// destination cannot be claimed exclusively.
    fn open(&mut self) -> Result<()>;

    /// Persist a channel's schema registration record.
    fn write_channel(
        &mut self,
        name: &str,
        message_type: &str,
        schema_descriptor: &[u8],
    ) -> Result<()>;

    /// Persist one message record with its receipt timestamp.
    fn write_message(&mut self, name: &str, payload: &[u8], timestamp_ns: u64) -> Result<()>;

    /// Flush and release the output resource.
    fn close(&mut self) -> Result<()>;

    /// Release the output resource and remove anything created for it,
    /// so a session that failed to start leaves no artifact behind.
    fn discard(&mut self) -> Result<()>;

    /// Backend type identifier.
    fn backend_type(&self) -> &str;
}
