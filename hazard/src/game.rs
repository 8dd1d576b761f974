use serde::{Deserialize, Serialize};

pub const DEFAULT_TIME_LIMIT_SECS: u32 = 300;
pub const DEFAULT_MAX_CLICKS: u32 = 17;
pub const DEFAULT_TARGET_RISKS: u32 = 15;

/// A timed game: an ordered list of images played under one click and time budget.
/// Read-only from the point of view of a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
    #[serde(default = "default_max_clicks")]
    pub max_clicks: u32,
    #[serde(default = "default_target_risks")]
    pub target_risks: u32,
    /// Image ids, in play order.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

fn default_max_clicks() -> u32 {
    DEFAULT_MAX_CLICKS
}

fn default_target_risks() -> u32 {
    DEFAULT_TARGET_RISKS
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game name must not be empty")]
    EmptyName,
    #[error("max_clicks must be greater than zero")]
    NoClickBudget,
    #[error("game has no images")]
    NoImages,
}

impl GameConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            time_limit: DEFAULT_TIME_LIMIT_SECS,
            max_clicks: DEFAULT_MAX_CLICKS,
            target_risks: DEFAULT_TARGET_RISKS,
            images: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Structural checks applied whenever a game is created or edited.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.name.trim().is_empty() {
            return Err(GameError::EmptyName);
        }
        if self.max_clicks == 0 {
            return Err(GameError::NoClickBudget);
        }
        Ok(())
    }

    /// A game can only be started once it has something to play on.
    pub fn ensure_playable(&self) -> Result<(), GameError> {
        self.validate()?;
        if self.images.is_empty() {
            return Err(GameError::NoImages);
        }
        Ok(())
    }

    pub fn image_at(&self, index: usize) -> Option<&str> {
        self.images.get(index).map(String::as_str)
    }
}
