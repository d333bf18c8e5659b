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

// In-memory record log, used by tests and short-lived capture sessions

use super::backend::RecordLog;
use anyhow::{bail, Result};
use std::sync::{Arc, Mutex};

/// One persisted unit of a recording session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Channel {
        name: String,
        message_type: String,
        schema_descriptor: Vec<u8>,
    },
    Message {
        name: String,
        payload: Vec<u8>,
        timestamp_ns: u64,
    },
}

/// Record log that keeps everything in memory.
///
/// Clones share the underlying record store, so a clone kept by a test
/// can inspect what the recorder wrote through its own boxed instance.
#[derive(Clone, Default)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<Record>>>,
    open: bool,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records written so far.
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl RecordLog for MemoryLog {
    fn open(&mut self) -> Result<()> {
        if self.open {
            bail!("memory log already open");
        }
        self.open = true;
        Ok(())
    }

    fn write_channel(
        &mut self,
        name: &str,
        message_type: &str,
        schema_descriptor: &[u8],
    ) -> Result<()> {
        if !self.open {
            bail!("memory log not open");
        }
        self.records.lock().unwrap().push(Record::Channel {
            name: name.to_string(),
            message_type: message_type.to_string(),
            schema_descriptor: schema_descriptor.to_vec(),
        });
        Ok(())
    }

    fn write_message(&mut self, name: &str, payload: &[u8], timestamp_ns: u64) -> Result<()> {
        if !self.open {
            bail!("memory log not open");
        }
        self.records.lock().unwrap().push(Record::Message {
            name: name.to_string(),
            payload: payload.to_vec(),
            timestamp_ns,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        self.open = false;
        self.records.lock().unwrap().clear();
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_records() {
        let handle = MemoryLog::new();
        let mut log = handle.clone();
        log.open().unwrap();
        log.write_channel("chassis", "demo.Msg", b"schema").unwrap();
        log.write_message("chassis", b"payload", 42).unwrap();

        assert_eq!(handle.len(), 2);
        assert_eq!(
            handle.records()[0],
            Record::Channel {
                name: "chassis".into(),
                message_type: "demo.Msg".into(),
                schema_descriptor: b"schema".to_vec(),
            }
        );
    }

    #[test]
    fn test_writes_rejected_when_not_open() {
        let mut log = MemoryLog::new();
        assert!(log.write_message("chassis", b"payload", 1).is_err());
        log.open().unwrap();
        log.write_message("chassis", b"payload", 1).unwrap();
        log.close().unwrap();
        assert!(log.write_message("chassis", b"payload", 2).is_err());
    }

    #[test]
    fn test_discard_clears_records() {
        let handle = MemoryLog::new();
        let mut log = handle.clone();
        log.open().unwrap();
        log.write_message("chassis", b"payload", 1).unwrap();
        log.discard().unwrap();
        assert!(handle.is_empty());
    }
}
