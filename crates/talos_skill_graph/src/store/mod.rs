// SPDX-License-Identifier: MIT OR Apache-2.0
//! External graph store boundary.
//!
//! A store holds one serialized skill graph per bot, keyed by the bot's
//! path. The editor only ever talks to it through [`GraphStore`].

mod fs;
mod memory;

pub use fs::{
    BotConfig, FileGraphStore, BOTS_LIST_FILE_NAME, GRAPH_FILE_NAME, SKILLS_LIST_FILE_NAME,
};
pub use memory::MemoryGraphStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Opaque identity of a bot, as handed out by the bot list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotPath(pub String);

impl BotPath {
    /// Create a bot path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Borrow the raw path
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BotPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

/// An entry of the bot list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotEntry {
    /// Bot name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Where the bot lives; also its graph store key
    pub path: String,
}

impl BotEntry {
    /// Store key of this bot
    pub fn bot_path(&self) -> BotPath {
        BotPath::new(self.path.clone())
    }
}

/// An entry of the skill catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Skill name
    pub name: String,
    /// Where the skill's source lives
    pub path: String,
}

/// Request/response access to stored skill graphs
pub trait GraphStore: Send + Sync + 'static {
    /// Fetch the serialized graph of a bot
    fn load_graph(&self, bot: &BotPath) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Overwrite the serialized graph of a bot
    fn save_graph(
        &self,
        bot: &BotPath,
        graph_json: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Errors reported by a graph store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing stored for this bot yet
    #[error("No skill graph stored for bot {0}")]
    NotFound(BotPath),

    /// Bot directory already present
    #[error("Bot '{0}' already exists")]
    BotExists(String),

    /// Name unusable as a directory name
    #[error("Invalid bot name: {0:?}")]
    InvalidBotName(String),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bot list or skill catalog could not be parsed
    #[error("Malformed list: {0}")]
    MalformedList(#[from] ron::error::SpannedError),

    /// Bot list or bot config could not be written
    #[error("Failed to encode: {0}")]
    Encode(#[from] ron::Error),

    /// Store reachable but refused the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
