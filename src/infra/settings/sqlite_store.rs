// SQLite-backed guild settings store.
//
// Tables:
// - guild_settings: one row per guild (prefix + optional mute role)

use crate::core::settings::{GuildSettings, SettingsError, SettingsStore, DEFAULT_PREFIX};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER PRIMARY KEY,
                prefix TEXT NOT NULL DEFAULT '.',
                mute_role_id INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_settings(row: &sqlx::sqlite::SqliteRow) -> GuildSettings {
        GuildSettings {
            guild_id: row.get::<i64, _>("guild_id") as u64,
            prefix: row.get("prefix"),
            mute_role_id: row
                .get::<Option<i64>, _>("mute_role_id")
                .map(|id| id as u64),
        }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get_or_init(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        // Insert-if-absent, then read: idempotent against racing first
        // messages from the same guild.
        sqlx::query(
            r#"
            INSERT INTO guild_settings (guild_id, prefix)
            VALUES (?, ?)
            ON CONFLICT(guild_id) DO NOTHING
            "#,
        )
        .bind(guild_id as i64)
        .bind(DEFAULT_PREFIX)
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        let row = sqlx::query("SELECT * FROM guild_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        Ok(Self::row_to_settings(&row))
    }

    async fn get(&self, guild_id: u64) -> Result<Option<GuildSettings>, SettingsError> {
        let row = sqlx::query("SELECT * FROM guild_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_settings))
    }

    async fn set_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), SettingsError> {
        sqlx::query("UPDATE guild_settings SET prefix = ? WHERE guild_id = ?")
            .bind(prefix)
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| SettingsError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn set_mute_role(&self, guild_id: u64, role_id: u64) -> Result<(), SettingsError> {
        sqlx::query("UPDATE guild_settings SET mute_role_id = ? WHERE guild_id = ?")
            .bind(role_id as i64)
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| SettingsError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteSettingsStore {
        // One connection: every handle sees the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteSettingsStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn get_or_init_is_idempotent() {
        let store = store().await;

        let first = store.get_or_init(42).await.unwrap();
        assert_eq!(first.prefix, DEFAULT_PREFIX);
        assert_eq!(first.mute_role_id, None);

        store.set_prefix(42, "!").await.unwrap();
        let second = store.get_or_init(42).await.unwrap();
        assert_eq!(second.prefix, "!");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM guild_settings")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn get_does_not_provision() {
        let store = store().await;
        assert!(store.get(42).await.unwrap().is_none());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM guild_settings")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn mute_role_persists() {
        let store = store().await;
        store.get_or_init(42).await.unwrap();
        store.set_mute_role(42, 777).await.unwrap();

        let settings = store.get(42).await.unwrap().unwrap();
        assert_eq!(settings.mute_role_id, Some(777));
        assert_eq!(settings.prefix, DEFAULT_PREFIX);
    }

    #[tokio::test]
    async fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());

        {
            let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
            let store = SqliteSettingsStore::new(pool);
            store.migrate().await.unwrap();
            store.get_or_init(42).await.unwrap();
            store.set_prefix(42, "?").await.unwrap();
        }

        let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
        let store = SqliteSettingsStore::new(pool);
        store.migrate().await.unwrap();
        assert_eq!(store.get(42).await.unwrap().unwrap().prefix, "?");
    }
}
