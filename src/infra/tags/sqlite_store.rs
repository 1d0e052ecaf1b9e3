// SQLite-backed tag store.
//
// Tables:
// - tags: (guild_id, name) primary key; name is stored lowercased

use crate::core::tags::{Tag, TagError, TagStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteTagStore {
    pool: Pool<Sqlite>,
}

impl SqliteTagStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                guild_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                uses INTEGER NOT NULL DEFAULT 0,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, name)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> Tag {
        let created_at: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Tag {
            guild_id: row.get::<i64, _>("guild_id") as u64,
            author_id: row.get::<i64, _>("author_id") as u64,
            uses: row.get::<i64, _>("uses") as u64,
            name: row.get("name"),
            content: row.get("content"),
            created_at,
        }
    }
}

#[async_trait]
impl TagStore for SqliteTagStore {
    async fn get(&self, guild_id: u64, name: &str) -> Result<Option<Tag>, TagError> {
        let row = sqlx::query("SELECT * FROM tags WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TagError::StorageError(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_tag))
    }

    async fn insert(&self, tag: Tag) -> Result<(), TagError> {
        sqlx::query(
            r#"
            INSERT INTO tags (guild_id, author_id, uses, name, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tag.guild_id as i64)
        .bind(tag.author_id as i64)
        .bind(tag.uses as i64)
        .bind(&tag.name)
        .bind(&tag.content)
        .bind(tag.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| TagError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn update_content(
        &self,
        guild_id: u64,
        name: &str,
        content: &str,
    ) -> Result<(), TagError> {
        sqlx::query("UPDATE tags SET content = ? WHERE guild_id = ? AND name = ?")
            .bind(content)
            .bind(guild_id as i64)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| TagError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, guild_id: u64, name: &str) -> Result<(), TagError> {
        sqlx::query("DELETE FROM tags WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| TagError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn increment_uses(&self, guild_id: u64, name: &str) -> Result<(), TagError> {
        sqlx::query("UPDATE tags SET uses = uses + 1 WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| TagError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn names_sorted(&self, guild_id: u64, min_len: usize) -> Result<Vec<String>, TagError> {
        let rows = sqlx::query(
            "SELECT name FROM tags WHERE guild_id = ? AND LENGTH(name) > ? ORDER BY name ASC",
        )
        .bind(guild_id as i64)
        .bind(min_len as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TagError::StorageError(e.to_string()))?;

        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    async fn names_by_author(
        &self,
        guild_id: u64,
        author_id: u64,
    ) -> Result<Vec<String>, TagError> {
        let rows = sqlx::query(
            "SELECT name FROM tags WHERE guild_id = ? AND author_id = ? ORDER BY name ASC",
        )
        .bind(guild_id as i64)
        .bind(author_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TagError::StorageError(e.to_string()))?;

        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    async fn names_by_uses(&self, guild_id: u64, min_len: usize) -> Result<Vec<String>, TagError> {
        let rows = sqlx::query(
            "SELECT name FROM tags WHERE guild_id = ? AND LENGTH(name) > ? ORDER BY uses DESC",
        )
        .bind(guild_id as i64)
        .bind(min_len as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TagError::StorageError(e.to_string()))?;

        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    async fn uses_counts(&self, guild_id: u64) -> Result<Vec<u64>, TagError> {
        let rows = sqlx::query("SELECT uses FROM tags WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TagError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| r.get::<i64, _>("uses") as u64)
            .collect())
    }

    async fn random_name(&self, guild_id: u64) -> Result<Option<String>, TagError> {
        let row = sqlx::query(
            "SELECT name FROM tags WHERE guild_id = ? ORDER BY RANDOM() LIMIT 1",
        )
        .bind(guild_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TagError::StorageError(e.to_string()))?;

        Ok(row.map(|r| r.get("name")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteTagStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteTagStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn tag(guild_id: u64, name: &str, uses: u64) -> Tag {
        Tag {
            guild_id,
            author_id: 100,
            uses,
            name: name.to_string(),
            content: "content".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let store = store().await;
        store.insert(tag(1, "foo", 0)).await.unwrap();

        let fetched = store.get(1, "foo").await.unwrap().unwrap();
        assert_eq!(fetched.name, "foo");
        assert_eq!(fetched.content, "content");
        assert_eq!(fetched.uses, 0);

        assert!(store.get(2, "foo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_storage_error() {
        let store = store().await;
        store.insert(tag(1, "foo", 0)).await.unwrap();
        // The (guild_id, name) primary key backs up the service-level check.
        assert!(store.insert(tag(1, "foo", 0)).await.is_err());
        store.insert(tag(2, "foo", 0)).await.unwrap();
    }

    #[tokio::test]
    async fn increment_and_ordering() {
        let store = store().await;
        store.insert(tag(1, "aaa", 0)).await.unwrap();
        store.insert(tag(1, "bbb", 0)).await.unwrap();
        store.insert(tag(1, "ab", 0)).await.unwrap();

        for _ in 0..3 {
            store.increment_uses(1, "bbb").await.unwrap();
        }
        store.increment_uses(1, "aaa").await.unwrap();

        // Two-character names are filtered from listings.
        assert_eq!(store.names_sorted(1, 2).await.unwrap(), vec!["aaa", "bbb"]);
        assert_eq!(
            store.names_by_uses(1, 2).await.unwrap(),
            vec!["bbb", "aaa"]
        );

        let mut counts = store.uses_counts(1).await.unwrap();
        counts.sort();
        assert_eq!(counts, vec![0, 1, 3]);
    }

    #[tokio::test]
    async fn delete_and_random() {
        let store = store().await;
        assert!(store.random_name(1).await.unwrap().is_none());

        store.insert(tag(1, "only", 0)).await.unwrap();
        assert_eq!(store.random_name(1).await.unwrap().unwrap(), "only");

        store.delete(1, "only").await.unwrap();
        assert!(store.get(1, "only").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn names_by_author_filters() {
        let store = store().await;
        store.insert(tag(1, "zeta", 0)).await.unwrap();
        let mut other = tag(1, "alpha", 0);
        other.author_id = 200;
        store.insert(other).await.unwrap();

        assert_eq!(store.names_by_author(1, 100).await.unwrap(), vec!["zeta"]);
        assert_eq!(store.names_by_author(1, 200).await.unwrap(), vec!["alpha"]);
    }
}
