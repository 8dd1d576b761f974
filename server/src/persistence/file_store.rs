use super::json_store::{JsonStore, Storable};
use super::traits::{GameRepository, ImageRepository, ResultRepository, SessionRepository};
use super::PersistenceError;
use hazard::{GameConfig, GameImage, GameResult, GameSession};
use std::path::PathBuf;

impl Storable for GameImage {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Storable for GameConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Storable for GameSession {
    fn id(&self) -> &str {
        GameSession::id(self)
    }
}

/// Results are keyed by session so the file system enforces one per session.
impl Storable for GameResult {
    fn id(&self) -> &str {
        &self.session_id
    }
}

/// Document store backed by one JSON file per record, one directory per
/// collection.
pub struct FileStore {
    images: JsonStore<GameImage>,
    games: JsonStore<GameConfig>,
    sessions: JsonStore<GameSession>,
    results: JsonStore<GameResult>,
}

impl FileStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            images: JsonStore::new(data_dir.join("images")),
            games: JsonStore::new(data_dir.join("games")),
            sessions: JsonStore::new(data_dir.join("sessions")),
            results: JsonStore::new(data_dir.join("results")),
        }
    }
}

impl ImageRepository for FileStore {
    async fn save_image(&self, image: &GameImage) -> Result<(), PersistenceError> {
        self.images.save(image)?;
        Ok(())
    }

    async fn load_image(&self, id: &str) -> Result<Option<GameImage>, PersistenceError> {
        self.images.load(id)
    }

    async fn list_images(&self) -> Result<Vec<GameImage>, PersistenceError> {
        let mut images = self.images.load_all()?;
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(images)
    }

    async fn delete_image(&self, id: &str) -> Result<bool, PersistenceError> {
        self.images.delete(id)
    }
}

impl GameRepository for FileStore {
    async fn save_game(&self, game: &GameConfig) -> Result<(), PersistenceError> {
        self.games.save(game)?;
        Ok(())
    }

    async fn load_game(&self, id: &str) -> Result<Option<GameConfig>, PersistenceError> {
        self.games.load(id)
    }

    async fn list_games(&self) -> Result<Vec<GameConfig>, PersistenceError> {
        let mut games = self.games.load_all()?;
        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(games)
    }

    async fn delete_game(&self, id: &str) -> Result<bool, PersistenceError> {
        self.games.delete(id)
    }
}

impl SessionRepository for FileStore {
    async fn save_session(&self, session: &GameSession) -> Result<(), PersistenceError> {
        self.sessions.save(session)?;
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<GameSession>, PersistenceError> {
        self.sessions.load(id)
    }
}

impl ResultRepository for FileStore {
    async fn append_result(&self, result: &GameResult) -> Result<(), PersistenceError> {
        if self.results.insert(result)? {
            Ok(())
        } else {
            Err(PersistenceError::DuplicateResult(result.session_id.clone()))
        }
    }

    async fn list_results(&self) -> Result<Vec<GameResult>, PersistenceError> {
        let mut results = self.results.load_all()?;
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    async fn list_results_for_game(&self, game_id: &str) -> Result<Vec<GameResult>, PersistenceError> {
        let mut results = self.list_results().await?;
        results.retain(|r| r.game_id == game_id);
        Ok(results)
    }

    async fn load_result_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<GameResult>, PersistenceError> {
        self.results.load(session_id)
    }
}
