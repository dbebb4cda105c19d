//! In-memory store shared between handles.

use super::Store;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct MemoryState {
    data: Value,
    stamp: u64,
    dumps: Vec<Value>,
}

/// A store held in memory.
///
/// Clones share the same state, so one handle can be given to a root while
/// another plays the external writer (`replace`) or inspects what was
/// persisted (`dumps`).
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new(data: Value) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                data,
                stamp: 0,
                dumps: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // State stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Change the stored data as an outside writer would, advancing the stamp.
    pub fn replace(&self, data: Value) {
        let mut state = self.state();
        state.data = data;
        state.stamp += 1;
    }

    /// Change the stored data without touching the stamp.
    pub fn set_data(&self, data: Value) {
        self.state().data = data;
    }

    pub fn set_stamp(&self, stamp: u64) {
        self.state().stamp = stamp;
    }

    pub fn data(&self) -> Value {
        self.state().data.clone()
    }

    /// Every skeleton dumped so far, oldest first.
    pub fn dumps(&self) -> Vec<Value> {
        self.state().dumps.clone()
    }

    pub fn dump_count(&self) -> usize {
        self.state().dumps.len()
    }
}

impl Store for MemoryStore {
    type Stamp = u64;

    fn load(&self) -> anyhow::Result<Value> {
        Ok(self.data())
    }

    fn dump(&mut self, skeleton: &Value) -> anyhow::Result<()> {
        let mut state = self.state();
        state.data = skeleton.clone();
        state.dumps.push(skeleton.clone());
        state.stamp += 1;
        Ok(())
    }

    fn stamp(&self) -> anyhow::Result<u64> {
        Ok(self.state().stamp)
    }
}
