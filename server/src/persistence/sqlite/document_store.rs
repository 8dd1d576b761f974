//! SQLite implementation of every repository trait.

use serde::de::DeserializeOwned;
use sqlx::SqlitePool;

use crate::persistence::traits::{
    GameRepository, ImageRepository, ResultRepository, SessionRepository,
};
use crate::persistence::PersistenceError;
use hazard::{GameConfig, GameImage, GameResult, GameSession};

/// SQLite document store. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn decode<T: DeserializeOwned>(document: &str) -> Result<T, PersistenceError> {
    Ok(serde_json::from_str(document)?)
}

fn decode_all<T: DeserializeOwned>(rows: Vec<(String,)>) -> Result<Vec<T>, PersistenceError> {
    rows.iter().map(|(doc,)| decode(doc)).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl ImageRepository for SqliteStore {
    async fn save_image(&self, image: &GameImage) -> Result<(), PersistenceError> {
        let document = serde_json::to_string(image)?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO images (id, name, document, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&image.id)
        .bind(&image.name)
        .bind(document)
        .bind(image.created_at as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_image(&self, id: &str) -> Result<Option<GameImage>, PersistenceError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT document FROM images WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(doc,)| decode(&doc)).transpose()
    }

    async fn list_images(&self) -> Result<Vec<GameImage>, PersistenceError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT document FROM images ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        decode_all(rows)
    }

    async fn delete_image(&self, id: &str) -> Result<bool, PersistenceError> {
        let done = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

impl GameRepository for SqliteStore {
    async fn save_game(&self, game: &GameConfig) -> Result<(), PersistenceError> {
        let document = serde_json::to_string(game)?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO games (id, name, document, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&game.id)
        .bind(&game.name)
        .bind(document)
        .bind(game.created_at as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_game(&self, id: &str) -> Result<Option<GameConfig>, PersistenceError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT document FROM games WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(doc,)| decode(&doc)).transpose()
    }

    async fn list_games(&self) -> Result<Vec<GameConfig>, PersistenceError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT document FROM games ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        decode_all(rows)
    }

    async fn delete_game(&self, id: &str) -> Result<bool, PersistenceError> {
        let done = sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

impl SessionRepository for SqliteStore {
    async fn save_session(&self, session: &GameSession) -> Result<(), PersistenceError> {
        let document = serde_json::to_string(session)?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO sessions (id, game_id, status, document, started_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id())
        .bind(session.game_id())
        .bind(session.status().as_str())
        .bind(document)
        .bind(session.started_at() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<GameSession>, PersistenceError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT document FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(doc,)| decode(&doc)).transpose()
    }
}

impl ResultRepository for SqliteStore {
    async fn append_result(&self, result: &GameResult) -> Result<(), PersistenceError> {
        let document = serde_json::to_string(result)?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO results (id, session_id, game_id, document, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.id)
        .bind(&result.session_id)
        .bind(&result.game_id)
        .bind(document)
        .bind(result.created_at as i64)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(PersistenceError::DuplicateResult(result.session_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_results(&self) -> Result<Vec<GameResult>, PersistenceError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT document FROM results ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        decode_all(rows)
    }

    async fn list_results_for_game(&self, game_id: &str) -> Result<Vec<GameResult>, PersistenceError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT document FROM results WHERE game_id = ? ORDER BY created_at DESC",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn load_result_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<GameResult>, PersistenceError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT document FROM results WHERE session_id = ?")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(doc,)| decode(&doc)).transpose()
    }
}
