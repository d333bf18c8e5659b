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

// Per-channel subscription ownership and discovery deduplication

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;

/// An active per-channel subscription: the channel name bound to its
/// delivery task. Dropping the subscription aborts the task.
pub struct Subscription {
    channel: String,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(channel: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            channel: channel.into(),
            task,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Slot {
    /// Name reserved by `try_register`; subscription not yet created.
    Reserved,
    Active(Subscription),
}

/// Mapping from channel name to its subscription.
///
/// This is the deduplication authority for discovery: the startup
/// catch-up snapshot and the live change listener may both announce the
/// same channel concurrently, and only the first `try_register` wins.
#[derive(Default)]
pub struct ChannelRegistry {
    slots: DashMap<String, Slot>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check absence and reserve the slot. Returns false when
    /// the channel is already reserved or active.
    pub fn try_register(&self, name: &str) -> bool {
        match self.slots.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Slot::Reserved);
                true
            }
        }
    }

    /// Bind the subscription to a previously reserved name.
    pub fn activate(&self, name: &str, subscription: Subscription) {
        self.slots.insert(name.to_string(), Slot::Active(subscription));
    }

    /// Remove the channel's slot, returning the subscription if one was
    /// active. Releasing a reservation allows a later discovery event to
    /// retry the channel.
    pub fn release(&self, name: &str) -> Option<Subscription> {
        match self.slots.remove(name)? {
            (_, Slot::Active(subscription)) => Some(subscription),
            (_, Slot::Reserved) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Remove every slot, returning the active subscriptions so the
    /// caller controls when their delivery tasks are torn down.
    pub fn drain(&self) -> Vec<Subscription> {
        let names: Vec<String> = self.slots.iter().map(|entry| entry.key().clone()).collect();
        names.iter().filter_map(|name| self.release(name)).collect()
    }
}
