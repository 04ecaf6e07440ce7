// SPDX-License-Identifier: MIT OR Apache-2.0
//! Filesystem-backed graph store and bot directory.
//!
//! Layout under the projects directory:
//!
//! ```text
//! projects/
//!   skills/
//!     skills_list.ron
//!   bots/
//!     bots_list.ron
//!     <bot>/
//!       config.ron
//!       skillgraph.json
//!       src/main.py
//!       skills/
//! ```

use super::{BotEntry, BotPath, GraphStore, SkillEntry, StoreError};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Graph document file inside a bot directory
pub const GRAPH_FILE_NAME: &str = "skillgraph.json";

/// Bot list file inside the bots directory
pub const BOTS_LIST_FILE_NAME: &str = "bots_list.ron";

/// Skill catalog file inside the skills directory
pub const SKILLS_LIST_FILE_NAME: &str = "skills_list.ron";

/// Bot config file inside a bot directory
const BOT_CONFIG_FILE_NAME: &str = "config.ron";

/// Initial contents of a new bot's entry script
const MAIN_SCRIPT: &str = "# main bot logic goes here\n";

/// Per-bot settings written when the bot is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot name
    pub name: String,
    /// Bot description
    pub description: String,
}

/// Stores bots and their skill graphs on disk
#[derive(Debug, Clone)]
pub struct FileGraphStore {
    projects_dir: PathBuf,
}

impl FileGraphStore {
    /// Create a store rooted at a projects directory
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
        }
    }

    /// Root directory
    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Directory holding the default bot folders and the bot list
    pub fn bots_dir(&self) -> PathBuf {
        self.projects_dir.join("bots")
    }

    fn bots_list_path(&self) -> PathBuf {
        self.bots_dir().join(BOTS_LIST_FILE_NAME)
    }

    /// Directory holding the skill catalog
    pub fn skills_dir(&self) -> PathBuf {
        self.projects_dir.join("skills")
    }

    /// Graph file of a bot
    pub fn graph_path(bot: &BotPath) -> PathBuf {
        Path::new(bot.as_str()).join(GRAPH_FILE_NAME)
    }

    /// Read the bot list. A missing list means no bots.
    pub async fn list_bots(&self) -> Result<Vec<BotEntry>, StoreError> {
        match tokio::fs::read_to_string(self.bots_list_path()).await {
            Ok(content) => Ok(ron::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the skill catalog. A missing catalog means no skills.
    pub async fn list_skills(&self) -> Result<Vec<SkillEntry>, StoreError> {
        let path = self.skills_dir().join(SKILLS_LIST_FILE_NAME);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(ron::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a bot folder with its default files and register it in the
    /// bot list. `parent_dir` overrides the default bots directory.
    pub async fn create_bot(
        &self,
        name: &str,
        description: &str,
        parent_dir: Option<&Path>,
    ) -> Result<BotEntry, StoreError> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StoreError::InvalidBotName(name.to_string()));
        }

        let parent = match parent_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => self.bots_dir(),
        };
        tokio::fs::create_dir_all(&parent).await?;
        tokio::fs::create_dir_all(self.bots_dir()).await?;

        let bot_dir = parent.join(name);
        if tokio::fs::try_exists(&bot_dir).await? {
            return Err(StoreError::BotExists(name.to_string()));
        }

        tokio::fs::create_dir_all(bot_dir.join("src")).await?;
        tokio::fs::create_dir_all(bot_dir.join("skills")).await?;

        let config = BotConfig {
            name: name.to_string(),
            description: description.to_string(),
        };
        let config_ron = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default())?;
        tokio::fs::write(bot_dir.join(BOT_CONFIG_FILE_NAME), config_ron).await?;
        tokio::fs::write(bot_dir.join("src").join("main.py"), MAIN_SCRIPT).await?;

        let entry = BotEntry {
            name: name.to_string(),
            description: description.to_string(),
            path: bot_dir.to_string_lossy().into_owned(),
        };
        let mut bots = self.list_bots().await?;
        bots.push(entry.clone());
        let list_ron = ron::ser::to_string_pretty(&bots, ron::ser::PrettyConfig::default())?;
        tokio::fs::write(self.bots_list_path(), list_ron).await?;

        tracing::info!("Created bot '{}' at {}", entry.name, bot_dir.display());
        Ok(entry)
    }
}

impl GraphStore for FileGraphStore {
    async fn load_graph(&self, bot: &BotPath) -> Result<String, StoreError> {
        match tokio::fs::read_to_string(Self::graph_path(bot)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(bot.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_graph(&self, bot: &BotPath, graph_json: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(bot.as_str()).await?;
        tokio::fs::write(Self::graph_path(bot), graph_json).await?;
        Ok(())
    }
}
