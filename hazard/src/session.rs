//! The per-player session record and its state machine.
//!
//! ```text
//! Active --(click budget or time budget exhausted)--> Completed
//! Active --(explicit timeout)------------------------> TimedOut
//! ```
//!
//! Both terminal states are final. Every mutation goes through a method on
//! [`GameSession`]; the counters are not writable from outside this module.

use serde::{Deserialize, Serialize};

use crate::game::{GameConfig, GameError};
use crate::geometry::Point;
use crate::result::{GameResult, ImageResult};
use crate::zone::{hit_test, RiskZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "timeout")]
    TimedOut,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::TimedOut => "timeout",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session is not active (status: {0})")]
    NotActive(SessionStatus),
    #[error("player name must not be empty")]
    MissingPlayerName,
    #[error("image index {index} out of range for a game with {len} images")]
    ImageIndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Zone ids credited to a session, in the order they were found.
///
/// Serialized as a plain JSON array. Duplicates are dropped on the way in,
/// whatever the source document contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FoundRisks(Vec<String>);

impl FoundRisks {
    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|existing| existing == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for FoundRisks {
    fn from(ids: Vec<String>) -> Self {
        let mut found = Self::default();
        for id in &ids {
            found.insert(id);
        }
        found
    }
}

impl From<FoundRisks> for Vec<String> {
    fn from(found: FoundRisks) -> Self {
        found.0
    }
}

/// Response to a single click.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickOutcome {
    /// `false` when the click arrived after the session had already ended.
    pub active: bool,
    pub hit: bool,
    pub risk_zone: Option<RiskZone>,
    pub clicks_used: u32,
    pub score: u32,
    /// Number of distinct zones found so far.
    pub found_risks: usize,
    /// Sent as `game_status`, the name game clients poll for.
    #[serde(rename = "game_status")]
    pub status: SessionStatus,
    pub clicks_remaining: u32,
    pub time_remaining: u32,
    /// `true` only on the click that ended the game.
    pub game_completed: bool,
    /// Emitted exactly once, together with `game_completed`.
    #[serde(skip)]
    pub result: Option<GameResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    id: String,
    game_id: String,
    player_name: String,
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    current_image_index: usize,
    #[serde(default)]
    found_risks: FoundRisks,
    #[serde(default)]
    clicks_used: u32,
    #[serde(default)]
    time_remaining: u32,
    #[serde(default)]
    score: u32,
    status: SessionStatus,
    started_at: u64,
    #[serde(default)]
    completed_at: Option<u64>,
    #[serde(default)]
    image_results: Vec<ImageResult>,
}

impl GameSession {
    /// Start a fresh session on `game` with zeroed counters and the full time budget.
    pub fn start(
        id: impl Into<String>,
        game: &GameConfig,
        player_name: &str,
        team_name: &str,
        now: u64,
    ) -> Result<Self, SessionError> {
        game.ensure_playable()?;
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(SessionError::MissingPlayerName);
        }

        Ok(Self {
            id: id.into(),
            game_id: game.id.clone(),
            player_name: player_name.to_string(),
            team_name: team_name.trim().to_string(),
            current_image_index: 0,
            found_risks: FoundRisks::default(),
            clicks_used: 0,
            time_remaining: game.time_limit,
            score: 0,
            status: SessionStatus::Active,
            started_at: now,
            completed_at: None,
            image_results: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    pub fn current_image_index(&self) -> usize {
        self.current_image_index
    }

    pub fn found_risks(&self) -> &FoundRisks {
        &self.found_risks
    }

    pub fn clicks_used(&self) -> u32 {
        self.clicks_used
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<u64> {
        self.completed_at
    }

    pub fn image_results(&self) -> &[ImageResult] {
        &self.image_results
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Register one click against the zones of the current image.
    ///
    /// The caller resolves `game` and `zones` before calling; a missing game
    /// or image must be reported as an error without touching the session.
    pub fn register_click(
        &mut self,
        game: &GameConfig,
        zones: &[RiskZone],
        point: Point,
        now: u64,
    ) -> ClickOutcome {
        if !self.is_active() {
            return self.outcome(game, false, None, None);
        }

        self.sync_clock(game, now);
        self.clicks_used = self.clicks_used.saturating_add(1);

        let matched = hit_test(point, zones).cloned();
        if let Some(zone) = &matched {
            if self.found_risks.insert(&zone.id) {
                self.score = self.score.saturating_add(zone.points);
                if let Some(image_id) = game.image_at(self.current_image_index) {
                    self.credit_image(image_id, zone.points);
                }
            }
        }

        let result = if self.clicks_used >= game.max_clicks || self.time_remaining == 0 {
            self.status = SessionStatus::Completed;
            self.completed_at = Some(now);
            let spent = game.time_limit.saturating_sub(self.time_remaining);
            Some(self.build_result(game, spent, now))
        } else {
            None
        };

        let hit = matched.is_some();
        self.outcome(game, hit, matched, result)
    }

    /// End the session on an explicit timeout signal. Charges the full time
    /// limit, whatever `time_remaining` says.
    pub fn register_timeout(
        &mut self,
        game: &GameConfig,
        now: u64,
    ) -> Result<GameResult, SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive(self.status));
        }
        self.time_remaining = 0;
        self.status = SessionStatus::TimedOut;
        self.completed_at = Some(now);
        Ok(self.build_result(game, game.time_limit, now))
    }

    /// Move to another image of the game.
    pub fn select_image(&mut self, game: &GameConfig, index: usize) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive(self.status));
        }
        if index >= game.images.len() {
            return Err(SessionError::ImageIndexOutOfRange {
                index,
                len: game.images.len(),
            });
        }
        self.current_image_index = index;
        Ok(())
    }

    /// Accept a client-side countdown value. The remaining time never goes up.
    pub fn report_time_remaining(&mut self, seconds: u32) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive(self.status));
        }
        self.time_remaining = self.time_remaining.min(seconds);
        Ok(())
    }

    /// Pull `time_remaining` down to what the wall clock allows.
    fn sync_clock(&mut self, game: &GameConfig, now: u64) {
        let elapsed = u32::try_from(now.saturating_sub(self.started_at)).unwrap_or(u32::MAX);
        let budget = game.time_limit.saturating_sub(elapsed);
        self.time_remaining = self.time_remaining.min(budget);
    }

    fn credit_image(&mut self, image_id: &str, points: u32) {
        match self
            .image_results
            .iter_mut()
            .find(|r| r.image_id == image_id)
        {
            Some(entry) => {
                entry.risks_found += 1;
                entry.score = entry.score.saturating_add(points);
            }
            None => self.image_results.push(ImageResult {
                image_id: image_id.to_string(),
                risks_found: 1,
                score: points,
            }),
        }
    }

    /// Rebuild the result a terminal session emitted, with the same time
    /// charge. `None` while the session is still active.
    pub fn final_result(&self, game: &GameConfig, now: u64) -> Option<GameResult> {
        let spent = match self.status {
            SessionStatus::Active => return None,
            SessionStatus::Completed => game.time_limit.saturating_sub(self.time_remaining),
            SessionStatus::TimedOut => game.time_limit,
        };
        Some(self.build_result(game, spent, self.completed_at.unwrap_or(now)))
    }

    /// Snapshot the current totals as a result record. One entry per game
    /// image in play order, followed by any credited image the game no
    /// longer lists.
    pub fn build_result(&self, game: &GameConfig, time_spent: u32, now: u64) -> GameResult {
        let mut image_results: Vec<ImageResult> = game
            .images
            .iter()
            .map(|image_id| {
                self.image_results
                    .iter()
                    .find(|r| &r.image_id == image_id)
                    .cloned()
                    .unwrap_or_else(|| ImageResult {
                        image_id: image_id.clone(),
                        ..ImageResult::default()
                    })
            })
            .collect();
        image_results.extend(
            self.image_results
                .iter()
                .filter(|r| !game.images.contains(&r.image_id))
                .cloned(),
        );

        GameResult {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: self.id.clone(),
            game_id: self.game_id.clone(),
            player_name: self.player_name.clone(),
            team_name: self.team_name.clone(),
            total_score: self.score,
            total_risks_found: u32::try_from(self.found_risks.len()).unwrap_or(u32::MAX),
            total_time_spent: time_spent,
            clicks_used: self.clicks_used,
            image_results,
            created_at: now,
        }
    }

    fn outcome(
        &self,
        game: &GameConfig,
        hit: bool,
        risk_zone: Option<RiskZone>,
        result: Option<GameResult>,
    ) -> ClickOutcome {
        ClickOutcome {
            active: result.is_some() || self.is_active(),
            hit,
            risk_zone,
            clicks_used: self.clicks_used,
            score: self.score,
            found_risks: self.found_risks.len(),
            status: self.status,
            clicks_remaining: game.max_clicks.saturating_sub(self.clicks_used),
            time_remaining: self.time_remaining,
            game_completed: result.is_some(),
            result,
        }
    }
}
