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

// Record log module
//
// Provides a trait-based abstraction over the append-only output log,
// with a single-file backend for real sessions and an in-memory backend
// for tests and short-lived captures.
//
// This module is WRITE-ONLY by design; replay and indexing of recorded
// logs belong to other tools.

pub mod backend;
pub mod factory;
pub mod filesystem;
pub mod memory;

pub use backend::RecordLog;
pub use factory::LogFactory;
pub use filesystem::FileRecordLog;
pub use memory::{MemoryLog, Record};
