use serde::{Deserialize, Serialize};

/// Points and zones credited on a single image of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    pub image_id: String,
    pub risks_found: u32,
    pub score: u32,
}

/// Final outcome of a session. Created exactly once, when the session leaves
/// the active state, then handed off to the result store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub id: String,
    pub session_id: String,
    pub game_id: String,
    pub player_name: String,
    #[serde(default)]
    pub team_name: String,
    pub total_score: u32,
    pub total_risks_found: u32,
    /// Seconds charged against the game's time limit.
    pub total_time_spent: u32,
    #[serde(default)]
    pub clicks_used: u32,
    #[serde(default)]
    pub image_results: Vec<ImageResult>,
    pub created_at: u64,
}
