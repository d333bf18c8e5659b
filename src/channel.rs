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

// Channel descriptors and the recording scope filter

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Description of a channel as announced by the topology service.
///
/// A descriptor is only usable when all three fields are non-empty;
/// incomplete descriptors are discarded during discovery with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Channel name, unique within the transport.
    pub name: String,
    /// Fully qualified message type name.
    pub message_type: String,
    /// Opaque schema bytes enabling later decoding of recorded payloads.
    pub schema_descriptor: Vec<u8>,
}

impl ChannelDescriptor {
    pub fn new(
        name: impl Into<String>,
        message_type: impl Into<String>,
        schema_descriptor: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            message_type: message_type.into(),
            schema_descriptor: schema_descriptor.into(),
        }
    }

    /// Name of the first empty field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("channel name")
        } else if self.message_type.is_empty() {
            Some("message type")
        } else if self.schema_descriptor.is_empty() {
            Some("schema descriptor")
        } else {
            None
        }
    }
}

/// Which discovered channels a recording session captures.
#[derive(Debug, Clone)]
pub enum RecordingScope {
    /// Capture every channel with a valid descriptor.
    All,
    /// Capture only the named channels.
    Channels(HashSet<String>),
}

impl RecordingScope {
    /// Build an explicit-set scope from an iterator of channel names.
    pub fn channels<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Channels(names.into_iter().map(Into::into).collect())
    }

    /// Pure scope predicate: should this channel be captured?
    pub fn should_capture(&self, descriptor: &ChannelDescriptor) -> bool {
        match self {
            Self::All => true,
            Self::Channels(names) => names.contains(&descriptor.name),
        }
    }
}

impl Default for RecordingScope {
    fn default() -> Self {
        Self::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ChannelDescriptor {
        ChannelDescriptor::new(name, "demo.Msg", b"schema".to_vec())
    }

    #[test]
    fn test_complete_descriptor() {
        assert_eq!(descriptor("chassis").missing_field(), None);
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        assert_eq!(
            descriptor("").missing_field(),
            Some("channel name")
        );
        assert_eq!(
            ChannelDescriptor::new("chassis", "", b"schema".to_vec()).missing_field(),
            Some("message type")
        );
        assert_eq!(
            ChannelDescriptor::new("chassis", "demo.Msg", Vec::new()).missing_field(),
            Some("schema descriptor")
        );
    }

    #[test]
    fn test_scope_all_captures_everything() {
        let scope = RecordingScope::All;
        assert!(scope.should_capture(&descriptor("chassis")));
        assert!(scope.should_capture(&descriptor("pose")));
    }

    #[test]
    fn test_scope_set_membership() {
        let scope = RecordingScope::channels(["a", "b"]);
        assert!(scope.should_capture(&descriptor("a")));
        assert!(scope.should_capture(&descriptor("b")));
        assert!(!scope.should_capture(&descriptor("c")));
    }

    #[test]
    fn test_empty_scope_set_captures_nothing() {
        let scope = RecordingScope::channels(Vec::<String>::new());
        assert!(!scope.should_capture(&descriptor("a")));
    }
}
