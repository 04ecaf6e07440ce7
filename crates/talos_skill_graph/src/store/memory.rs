// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory graph store with failure injection.

use super::{BotPath, GraphStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    graphs: HashMap<BotPath, String>,
    /// Every successful write, in order
    writes: Vec<(BotPath, String)>,
    failing_saves: u32,
    failing_loads: bool,
    save_delay: Option<Duration>,
}

/// Graph store kept in memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraphStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a graph document directly into the store
    pub fn insert(&self, bot: BotPath, graph_json: impl Into<String>) {
        self.inner.lock().graphs.insert(bot, graph_json.into());
    }

    /// Current document of a bot
    pub fn get(&self, bot: &BotPath) -> Option<String> {
        self.inner.lock().graphs.get(bot).cloned()
    }

    /// All successful writes so far, oldest first
    pub fn writes(&self) -> Vec<(BotPath, String)> {
        self.inner.lock().writes.clone()
    }

    /// Make the next `count` saves fail
    pub fn fail_next_saves(&self, count: u32) {
        self.inner.lock().failing_saves = count;
    }

    /// Make every load fail while set
    pub fn set_failing_loads(&self, failing: bool) {
        self.inner.lock().failing_loads = failing;
    }

    /// Delay every save by `delay`
    pub fn set_save_delay(&self, delay: Option<Duration>) {
        self.inner.lock().save_delay = delay;
    }
}

impl GraphStore for MemoryGraphStore {
    async fn load_graph(&self, bot: &BotPath) -> Result<String, StoreError> {
        let inner = self.inner.lock();
        if inner.failing_loads {
            return Err(StoreError::Unavailable("load refused".to_string()));
        }
        inner
            .graphs
            .get(bot)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(bot.clone()))
    }

    async fn save_graph(&self, bot: &BotPath, graph_json: &str) -> Result<(), StoreError> {
        let delay = self.inner.lock().save_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        if inner.failing_saves > 0 {
            inner.failing_saves -= 1;
            return Err(StoreError::Unavailable("save refused".to_string()));
        }
        inner.graphs.insert(bot.clone(), graph_json.to_string());
        inner.writes.push((bot.clone(), graph_json.to_string()));
        Ok(())
    }
}
