// SQLite-backed moderation log.
//
// Tables:
// - mod_log: append-only, one row per applied action

use crate::core::moderation::{ModAction, ModLogStore, ModerationError, ModerationRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteModLogStore {
    pool: Pool<Sqlite>,
}

impl SqliteModLogStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mod_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                mod_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                reason TEXT NOT NULL,
                date TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_mod_log_guild_user
                ON mod_log(guild_id, user_id);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ModLogStore for SqliteModLogStore {
    async fn append(&self, record: ModerationRecord) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            INSERT INTO mod_log (guild_id, user_id, mod_id, action, reason, date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.guild_id as i64)
        .bind(record.user_id as i64)
        .bind(record.mod_id as i64)
        .bind(record.action.as_str())
        .bind(&record.reason)
        .bind(record.date.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn history(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<ModerationRecord>, ModerationError> {
        let rows = sqlx::query(
            r#"
            SELECT guild_id, user_id, mod_id, action, reason, date
            FROM mod_log
            WHERE guild_id = ? AND user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let action: String = row.get("action");
            // Unknown kinds would mean a schema from the future; skip them.
            let Some(action) = ModAction::from_str_lossy(&action) else {
                continue;
            };
            let date: String = row.get("date");
            let date = DateTime::parse_from_rfc3339(&date)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            records.push(ModerationRecord {
                guild_id: row.get::<i64, _>("guild_id") as u64,
                user_id: row.get::<i64, _>("user_id") as u64,
                mod_id: row.get::<i64, _>("mod_id") as u64,
                action,
                reason: row.get("reason"),
                date,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteModLogStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteModLogStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn record(user_id: u64, action: ModAction) -> ModerationRecord {
        ModerationRecord {
            guild_id: 1,
            user_id,
            mod_id: 100,
            action,
            reason: "No reason provided".to_string(),
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn history_is_append_ordered_and_scoped() {
        let store = store().await;
        store.append(record(200, ModAction::Warn)).await.unwrap();
        store.append(record(200, ModAction::Mute)).await.unwrap();
        store.append(record(201, ModAction::Ban)).await.unwrap();

        let history = store.history(1, 200).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, ModAction::Warn);
        assert_eq!(history[1].action, ModAction::Mute);

        assert!(store.history(2, 200).await.unwrap().is_empty());
    }
}
