mod actor;
pub mod commands;
pub mod handle;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hazard::{ClickOutcome, GameResult, GameSession, Point};
use tokio::sync::{mpsc, RwLock};

use crate::persistence::{generate_id, now_timestamp, Storage};
use actor::run_session_actor;
pub use commands::{ManagerError, SessionPatch};
pub use handle::SessionHandle;

/// Live actor handles by session id. Idle actors remove their own entry.
pub(crate) type Registry = Arc<RwLock<HashMap<String, SessionHandle>>>;

/// Manages live sessions. Spawns an actor task per session on first use so
/// that all writes to one session id are applied in order.
pub struct SessionManager<S> {
    sessions: Registry,
    store: Arc<S>,
    idle: Duration,
}

impl<S: Storage> SessionManager<S> {
    pub fn new(store: Arc<S>, idle: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            idle,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn start_session(
        &self,
        game_id: &str,
        player_name: &str,
        team_name: &str,
    ) -> Result<GameSession, ManagerError> {
        let game = self
            .store
            .load_game(game_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound("game", game_id.to_string()))?;

        let session =
            GameSession::start(generate_id(), &game, player_name, team_name, now_timestamp())?;
        self.store.save_session(&session).await?;

        tracing::info!(
            session_id = %session.id(),
            game_id = %game.id,
            player = %session.player_name(),
            "Session started"
        );
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<GameSession, ManagerError> {
        match self.handle(session_id).await?.get_snapshot().await {
            Err(ManagerError::ActorClosed) => self.handle(session_id).await?.get_snapshot().await,
            other => other,
        }
    }

    pub async fn handle_click(
        &self,
        session_id: &str,
        point: Point,
    ) -> Result<ClickOutcome, ManagerError> {
        match self.handle(session_id).await?.click(point).await {
            Err(ManagerError::ActorClosed) => self.handle(session_id).await?.click(point).await,
            other => other,
        }
    }

    pub async fn handle_timeout(&self, session_id: &str) -> Result<GameResult, ManagerError> {
        match self.handle(session_id).await?.timeout().await {
            Err(ManagerError::ActorClosed) => self.handle(session_id).await?.timeout().await,
            other => other,
        }
    }

    pub async fn update_session(
        &self,
        session_id: &str,
        patch: SessionPatch,
    ) -> Result<GameSession, ManagerError> {
        match self.handle(session_id).await?.update(patch.clone()).await {
            Err(ManagerError::ActorClosed) => self.handle(session_id).await?.update(patch).await,
            other => other,
        }
    }

    /// Stop every running actor.
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, h)| h)
            .collect();
        tracing::info!(count = handles.len(), "Stopping session actors");
        for handle in handles {
            tracing::debug!(session_id = %handle.id(), "Stopping actor");
            handle.shutdown().await;
        }
    }

    /// Live handle for `session_id`, spawning an actor from storage when none
    /// is running.
    async fn handle(&self, session_id: &str) -> Result<SessionHandle, ManagerError> {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have spawned it while we waited for the lock.
        if let Some(handle) = sessions.get(session_id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let session = self
            .store
            .load_session(session_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound("session", session_id.to_string()))?;

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        tokio::spawn(run_session_actor(
            session,
            Arc::clone(&self.store),
            cmd_rx,
            Arc::clone(&self.sessions),
            self.idle,
        ));

        let handle = SessionHandle::new(session_id.to_string(), cmd_tx);
        sessions.insert(session_id.to_string(), handle.clone());
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::{Database, SqliteStore};
    use crate::persistence::{
        FileStore, GameRepository, ImageRepository, PersistenceError, ResultRepository,
        SessionRepository,
    };
    use hazard::{
        Difficulty, GameConfig, GameImage, RiskZone, SessionError, SessionStatus, Shape,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    const IDLE: Duration = Duration::from_secs(60);

    fn zone(id: &str, shape: Shape, points: u32) -> RiskZone {
        RiskZone {
            id: id.to_string(),
            shape,
            description: format!("Zone {id}"),
            difficulty: Difficulty::Medium,
            points,
            explanation: String::new(),
        }
    }

    /// One image with a circle worth 5 and a rectangle worth 10.
    async fn seed<S: Storage>(store: &S, max_clicks: u32) -> GameConfig {
        let mut image = GameImage::new("img1", "Warehouse", "", 1);
        image
            .set_risk_zones(
                vec![
                    zone(
                        "z1",
                        Shape::Circle {
                            cx: 50.0,
                            cy: 30.0,
                            r: 15.0,
                        },
                        5,
                    ),
                    zone(
                        "z2",
                        Shape::Rectangle {
                            x: 20.0,
                            y: 60.0,
                            w: 30.0,
                            h: 20.0,
                        },
                        10,
                    ),
                ],
                1,
            )
            .unwrap();
        store.save_image(&image).await.unwrap();

        let mut game = GameConfig::new("g1", "Warehouse walk", 1);
        game.max_clicks = max_clicks;
        game.images = vec!["img1".to_string()];
        store.save_game(&game).await.unwrap();
        game
    }

    fn file_manager() -> (tempfile::TempDir, SessionManager<FileStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path().to_path_buf()));
        (dir, SessionManager::new(store, IDLE))
    }

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y).unwrap()
    }

    #[tokio::test]
    async fn test_click_scores_and_persists() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 3).await;
        let session = mgr.start_session("g1", "Alice", "Red").await.unwrap();

        let first = mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap();
        assert!(first.hit);
        assert_eq!(first.score, 5);
        assert_eq!(first.clicks_remaining, 2);

        let stored = mgr.store().load_session(session.id()).await.unwrap().unwrap();
        assert_eq!(stored.clicks_used(), 1);
        assert_eq!(stored.score(), 5);
    }

    #[tokio::test]
    async fn test_final_click_appends_one_result() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 2).await;
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();

        mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap();
        let last = mgr.handle_click(session.id(), pt(30.0, 70.0)).await.unwrap();
        assert!(last.game_completed);
        assert_eq!(last.status, SessionStatus::Completed);
        assert_eq!(last.score, 15);

        let late = mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap();
        assert!(!late.active);
        assert!(!late.game_completed);
        assert_eq!(late.clicks_used, 2);

        let results = mgr.store().list_results().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].total_score, 15);
        assert_eq!(results[0].total_risks_found, 2);
    }

    #[tokio::test]
    async fn test_concurrent_clicks_are_serialized() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 5).await;
        let mgr = Arc::new(mgr);
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let mgr = Arc::clone(&mgr);
            let id = session.id().to_string();
            tasks.push(tokio::spawn(async move {
                mgr.handle_click(&id, pt(1.0, 1.0)).await.unwrap()
            }));
        }
        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap());
        }

        assert_eq!(outcomes.iter().filter(|o| o.game_completed).count(), 1);
        assert_eq!(outcomes.iter().filter(|o| !o.active).count(), 3);

        let stored = mgr.get_session(session.id()).await.unwrap();
        assert_eq!(stored.clicks_used(), 5);
        assert_eq!(mgr.store().list_results().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_hits_on_same_zone_credit_once() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 17).await;
        let mgr = Arc::new(mgr);
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..6 {
            let mgr = Arc::clone(&mgr);
            let id = session.id().to_string();
            tasks.push(tokio::spawn(async move {
                mgr.handle_click(&id, pt(50.0, 30.0)).await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stored = mgr.get_session(session.id()).await.unwrap();
        assert_eq!(stored.clicks_used(), 6);
        assert_eq!(stored.score(), 5);
        assert_eq!(stored.found_risks().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_idempotent() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 17).await;
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();
        mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap();

        let first = mgr.handle_timeout(session.id()).await.unwrap();
        assert_eq!(first.total_time_spent, 300);
        assert_eq!(first.total_score, 5);

        let second = mgr.handle_timeout(session.id()).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(mgr.store().list_results().await.unwrap().len(), 1);

        let stored = mgr.get_session(session.id()).await.unwrap();
        assert_eq!(stored.status(), SessionStatus::TimedOut);
        assert_eq!(stored.time_remaining(), 0);
    }

    #[tokio::test]
    async fn test_timeout_writes_missing_result() {
        let (_dir, mgr) = file_manager();
        let game = seed(mgr.store().as_ref(), 17).await;

        // A timed-out session whose result was lost before reaching storage.
        let mut session = GameSession::start("s-lost", &game, "Bob", "", 10).unwrap();
        session.register_timeout(&game, 20).unwrap();
        mgr.store().save_session(&session).await.unwrap();

        let result = mgr.handle_timeout("s-lost").await.unwrap();
        assert_eq!(result.session_id, "s-lost");
        assert_eq!(result.total_time_spent, 300);
        assert_eq!(mgr.store().list_results().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 17).await;

        let err = mgr.handle_click("missing", pt(1.0, 1.0)).await.unwrap_err();
        assert!(matches!(err, ManagerError::NotFound("session", _)));

        let err = mgr.start_session("nope", "Alice", "").await.unwrap_err();
        assert!(matches!(err, ManagerError::NotFound("game", _)));
    }

    #[tokio::test]
    async fn test_click_with_missing_image_does_not_mutate() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 17).await;
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();
        mgr.store().delete_image("img1").await.unwrap();

        let err = mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap_err();
        assert!(matches!(err, ManagerError::NotFound("image", _)));

        let stored = mgr.get_session(session.id()).await.unwrap();
        assert_eq!(stored.clicks_used(), 0);
    }

    #[tokio::test]
    async fn test_missing_player_name_rejected() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 17).await;
        let err = mgr.start_session("g1", "   ", "").await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Session(SessionError::MissingPlayerName)
        ));
    }

    #[tokio::test]
    async fn test_update_session() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 17).await;
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();

        let patch = SessionPatch {
            current_image_index: None,
            time_remaining: Some(120),
        };
        let updated = mgr.update_session(session.id(), patch).await.unwrap();
        assert_eq!(updated.time_remaining(), 120);

        // Remaining time never goes back up.
        let patch = SessionPatch {
            current_image_index: None,
            time_remaining: Some(250),
        };
        let updated = mgr.update_session(session.id(), patch).await.unwrap();
        assert_eq!(updated.time_remaining(), 120);

        let patch = SessionPatch {
            current_image_index: Some(3),
            time_remaining: None,
        };
        let err = mgr.update_session(session.id(), patch).await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Session(SessionError::ImageIndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[tokio::test]
    async fn test_update_finished_session_rejected() {
        let (_dir, mgr) = file_manager();
        seed(mgr.store().as_ref(), 17).await;
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();
        mgr.handle_timeout(session.id()).await.unwrap();

        let err = mgr
            .update_session(session.id(), SessionPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Session(SessionError::NotActive(SessionStatus::TimedOut))
        ));
    }

    #[tokio::test]
    async fn test_idle_actor_is_respawned_from_storage() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path().to_path_buf()));
        let mgr = SessionManager::new(store, Duration::from_millis(20));
        seed(mgr.store().as_ref(), 17).await;
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();

        mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let outcome = mgr.handle_click(session.id(), pt(30.0, 70.0)).await.unwrap();
        assert_eq!(outcome.clicks_used, 2);
        assert_eq!(outcome.score, 15);
    }

    #[tokio::test]
    async fn test_sqlite_backend_end_to_end() {
        let db = Database::new_in_memory().await.unwrap();
        let store = Arc::new(SqliteStore::new(db.pool().clone()));
        let mgr = SessionManager::new(store, IDLE);
        seed(mgr.store().as_ref(), 1).await;

        let session = mgr.start_session("g1", "Alice", "Red").await.unwrap();
        let outcome = mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap();
        assert!(outcome.game_completed);

        let results = mgr.store().list_results_for_game("g1").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].team_name, "Red");
        mgr.shutdown().await;
    }

    #[tokio::test]
    async fn test_idle_actors_leave_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path().to_path_buf()));
        let mgr = SessionManager::new(store, Duration::from_millis(20));
        seed(mgr.store().as_ref(), 17).await;

        let mut ids = Vec::new();
        for i in 0..5 {
            let session = mgr.start_session("g1", &format!("Player {i}"), "").await.unwrap();
            mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap();
            ids.push(session.id().to_string());
        }
        assert_eq!(mgr.sessions.read().await.len(), 5);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(mgr.sessions.read().await.is_empty());

        let outcome = mgr.handle_click(&ids[0], pt(30.0, 70.0)).await.unwrap();
        assert_eq!(outcome.clicks_used, 2);
        assert_eq!(outcome.score, 15);
        assert_eq!(mgr.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clicks_across_idle_restarts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path().to_path_buf()));
        let mgr = Arc::new(SessionManager::new(store, Duration::from_millis(10)));
        seed(mgr.store().as_ref(), 17).await;
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();

        // Pairs of clicks arriving around the moment the actor goes idle.
        let mut tasks = Vec::new();
        for i in 0..16u64 {
            let mgr = Arc::clone(&mgr);
            let id = session.id().to_string();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis((i / 2) * 11)).await;
                mgr.handle_click(&id, pt(1.0, 1.0)).await.unwrap()
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().active);
        }

        let stored = mgr.store().load_session(session.id()).await.unwrap().unwrap();
        assert_eq!(stored.clicks_used(), 16);
        assert!(stored.is_active());
    }

    /// File store whose first `fail_appends` result writes fail.
    struct FlakyResults {
        inner: FileStore,
        fail_appends: AtomicUsize,
    }

    impl ImageRepository for FlakyResults {
        async fn save_image(&self, image: &GameImage) -> Result<(), PersistenceError> {
            self.inner.save_image(image).await
        }
        async fn load_image(&self, id: &str) -> Result<Option<GameImage>, PersistenceError> {
            self.inner.load_image(id).await
        }
        async fn list_images(&self) -> Result<Vec<GameImage>, PersistenceError> {
            self.inner.list_images().await
        }
        async fn delete_image(&self, id: &str) -> Result<bool, PersistenceError> {
            self.inner.delete_image(id).await
        }
        async fn load_zones_for_image(
            &self,
            id: &str,
        ) -> Result<Option<Vec<RiskZone>>, PersistenceError> {
            self.inner.load_zones_for_image(id).await
        }
    }

    impl GameRepository for FlakyResults {
        async fn save_game(&self, game: &GameConfig) -> Result<(), PersistenceError> {
            self.inner.save_game(game).await
        }
        async fn load_game(&self, id: &str) -> Result<Option<GameConfig>, PersistenceError> {
            self.inner.load_game(id).await
        }
        async fn list_games(&self) -> Result<Vec<GameConfig>, PersistenceError> {
            self.inner.list_games().await
        }
        async fn delete_game(&self, id: &str) -> Result<bool, PersistenceError> {
            self.inner.delete_game(id).await
        }
    }

    impl SessionRepository for FlakyResults {
        async fn save_session(&self, session: &GameSession) -> Result<(), PersistenceError> {
            self.inner.save_session(session).await
        }
        async fn load_session(&self, id: &str) -> Result<Option<GameSession>, PersistenceError> {
            self.inner.load_session(id).await
        }
    }

    impl ResultRepository for FlakyResults {
        async fn append_result(&self, result: &GameResult) -> Result<(), PersistenceError> {
            let failing = self
                .fail_appends
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(PersistenceError::Io(std::io::Error::other("disk full")));
            }
            self.inner.append_result(result).await
        }
        async fn load_result_for_session(
            &self,
            session_id: &str,
        ) -> Result<Option<GameResult>, PersistenceError> {
            self.inner.load_result_for_session(session_id).await
        }
        async fn list_results(&self) -> Result<Vec<GameResult>, PersistenceError> {
            self.inner.list_results().await
        }
        async fn list_results_for_game(
            &self,
            game_id: &str,
        ) -> Result<Vec<GameResult>, PersistenceError> {
            self.inner.list_results_for_game(game_id).await
        }
    }

    #[tokio::test]
    async fn test_click_after_failed_result_write_stores_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyResults {
            inner: FileStore::new(dir.path().to_path_buf()),
            fail_appends: AtomicUsize::new(1),
        });
        let mgr = SessionManager::new(store, IDLE);
        seed(mgr.store().as_ref(), 1).await;
        let session = mgr.start_session("g1", "Alice", "").await.unwrap();

        let err = mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap_err();
        assert!(matches!(err, ManagerError::Persistence(_)));
        let stored = mgr.store().load_session(session.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), SessionStatus::Completed);
        assert!(mgr.store().list_results().await.unwrap().is_empty());

        let again = mgr.handle_click(session.id(), pt(55.0, 35.0)).await.unwrap();
        assert!(!again.active);
        assert_eq!(again.clicks_used, 1);

        let results = mgr.store().list_results().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].session_id, session.id());
        assert_eq!(results[0].total_score, 5);
    }
}
