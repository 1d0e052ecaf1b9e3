// Tag business logic: validation, CRUD rules, lookup counting, ranking.
// NO Discord dependencies here - the discord layer formats the results.

use super::tag_models::{Tag, TagInfo};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

/// Tag names are capped so lists stay readable.
pub const MAX_NAME_LEN: usize = 50;
/// Discord's message cap; appended content must stay under it.
pub const MAX_CONTENT_LEN: usize = 2000;
/// Search queries shorter than this match too much to be useful.
pub const MIN_QUERY_LEN: usize = 2;

/// Broadcast mentions that are never allowed in tag names.
const RESERVED_TOKENS: [&str; 2] = ["@everyone", "@here"];

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum TagError {
    #[error("You need to actually pass in a tag name.")]
    MissingName,

    #[error("Tag name is a maximum of {MAX_NAME_LEN} characters.")]
    NameTooLong,

    #[error("That tag is using blocked words.")]
    ReservedToken,

    #[error("A tag with that name already exists")]
    AlreadyExists,

    #[error("A tag with that name doesn't exist")]
    NotFound,

    #[error(
        "That would make the tag too long ({MAX_CONTENT_LEN} characters), \
         the original tag's length is {original_len} characters"
    )]
    ContentTooLong { original_len: usize },

    #[error("Tag name query must be {MIN_QUERY_LEN} characters or more")]
    QueryTooShort,

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting tags. Names passed in are already lowercased.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn get(&self, guild_id: u64, name: &str) -> Result<Option<Tag>, TagError>;

    async fn insert(&self, tag: Tag) -> Result<(), TagError>;

    async fn update_content(
        &self,
        guild_id: u64,
        name: &str,
        content: &str,
    ) -> Result<(), TagError>;

    async fn delete(&self, guild_id: u64, name: &str) -> Result<(), TagError>;

    /// Bump the use counter. Read-then-write is fine; see `Tag::uses`.
    async fn increment_uses(&self, guild_id: u64, name: &str) -> Result<(), TagError>;

    /// Names with more than `min_len` characters, sorted ascending.
    async fn names_sorted(&self, guild_id: u64, min_len: usize) -> Result<Vec<String>, TagError>;

    /// One author's tag names, sorted ascending.
    async fn names_by_author(
        &self,
        guild_id: u64,
        author_id: u64,
    ) -> Result<Vec<String>, TagError>;

    /// Names with more than `min_len` characters, most used first.
    async fn names_by_uses(&self, guild_id: u64, min_len: usize) -> Result<Vec<String>, TagError>;

    /// Use counters of every tag in the guild, in no particular order.
    async fn uses_counts(&self, guild_id: u64) -> Result<Vec<u64>, TagError>;

    /// A uniformly random tag name, if the guild has any.
    async fn random_name(&self, guild_id: u64) -> Result<Option<String>, TagError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct TagService<S: TagStore> {
    store: S,
}

impl<S: TagStore> TagService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Defuse broadcast mentions by inserting a zero-width space.
    fn clean_content(content: &str) -> String {
        content
            .replace("@everyone", "@\u{200b}everyone")
            .replace("@here", "@\u{200b}here")
    }

    /// Lowercase + trim, then enforce the naming rules.
    fn normalize_name(name: &str) -> Result<String, TagError> {
        let lookup = name.to_lowercase().trim().to_string();
        if lookup.is_empty() {
            return Err(TagError::MissingName);
        }
        if lookup.chars().count() > MAX_NAME_LEN {
            return Err(TagError::NameTooLong);
        }
        if RESERVED_TOKENS.iter().any(|t| lookup.contains(t)) {
            return Err(TagError::ReservedToken);
        }
        Ok(lookup)
    }

    /// Create a tag. Fails on duplicates (case-insensitive, per guild).
    pub async fn create(
        &self,
        guild_id: u64,
        author_id: u64,
        name: &str,
        content: &str,
    ) -> Result<String, TagError> {
        let lookup = Self::normalize_name(name)?;
        if self.store.get(guild_id, &lookup).await?.is_some() {
            return Err(TagError::AlreadyExists);
        }
        let tag = Tag {
            guild_id,
            author_id,
            uses: 0,
            name: lookup.clone(),
            content: Self::clean_content(content),
            created_at: Utc::now(),
        };
        self.store.insert(tag).await?;
        Ok(lookup)
    }

    /// Replace a tag's content outright.
    pub async fn edit(&self, guild_id: u64, name: &str, content: &str) -> Result<(), TagError> {
        let lookup = Self::normalize_name(name)?;
        if self.store.get(guild_id, &lookup).await?.is_none() {
            return Err(TagError::NotFound);
        }
        self.store
            .update_content(guild_id, &lookup, &Self::clean_content(content))
            .await
    }

    /// Append a line to a tag. Rejects the append when the combined content
    /// would exceed `MAX_CONTENT_LEN`, reporting the original length.
    pub async fn append(&self, guild_id: u64, name: &str, addend: &str) -> Result<(), TagError> {
        let lookup = Self::normalize_name(name)?;
        let tag = self
            .store
            .get(guild_id, &lookup)
            .await?
            .ok_or(TagError::NotFound)?;

        let combined = format!("{}\n{}", tag.content, Self::clean_content(addend));
        if combined.chars().count() > MAX_CONTENT_LEN {
            return Err(TagError::ContentTooLong {
                original_len: tag.content.chars().count(),
            });
        }
        self.store.update_content(guild_id, &lookup, &combined).await
    }

    pub async fn delete(&self, guild_id: u64, name: &str) -> Result<(), TagError> {
        let lookup = name.to_lowercase().trim().to_string();
        if self.store.get(guild_id, &lookup).await?.is_none() {
            return Err(TagError::NotFound);
        }
        self.store.delete(guild_id, &lookup).await
    }

    /// Fetch a tag's content and count the use. Returns `None` on a miss so
    /// the caller decides between an inline notice (`tag x`) and silence
    /// (unknown-command fallback).
    pub async fn lookup(&self, guild_id: u64, name: &str) -> Result<Option<String>, TagError> {
        let lookup = name.to_lowercase().trim().to_string();
        let Some(tag) = self.store.get(guild_id, &lookup).await? else {
            return Ok(None);
        };
        self.store.increment_uses(guild_id, &lookup).await?;
        Ok(Some(tag.content))
    }

    /// A tag plus its popularity rank among the guild's tags.
    pub async fn info(&self, guild_id: u64, name: &str) -> Result<TagInfo, TagError> {
        let lookup = name.to_lowercase().trim().to_string();
        let tag = self
            .store
            .get(guild_id, &lookup)
            .await?
            .ok_or(TagError::NotFound)?;

        let counts = self.store.uses_counts(guild_id).await?;
        let rank = 1 + counts.iter().filter(|&&u| u > tag.uses).count();
        Ok(TagInfo { tag, rank })
    }

    /// All listable names in a guild, ascending. Single-character and
    /// two-character names are skipped, as the original listing always did.
    pub async fn list(&self, guild_id: u64) -> Result<Vec<String>, TagError> {
        self.store.names_sorted(guild_id, 2).await
    }

    pub async fn mine(&self, guild_id: u64, author_id: u64) -> Result<Vec<String>, TagError> {
        self.store.names_by_author(guild_id, author_id).await
    }

    /// A random tag name; the pick counts as a use.
    pub async fn random(&self, guild_id: u64) -> Result<Option<String>, TagError> {
        let Some(name) = self.store.random_name(guild_id).await? else {
            return Ok(None);
        };
        self.store.increment_uses(guild_id, &name).await?;
        Ok(Some(name))
    }

    /// Substring search over names, most used first.
    pub async fn search(&self, guild_id: u64, query: &str) -> Result<Vec<String>, TagError> {
        let query = query.to_lowercase();
        if query.chars().count() < MIN_QUERY_LEN {
            return Err(TagError::QueryTooShort);
        }
        let names = self.store.names_by_uses(guild_id, 2).await?;
        Ok(names.into_iter().filter(|n| n.contains(&query)).collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    /// In-memory store for testing, keyed by (guild_id, name).
    struct MockTagStore {
        tags: DashMap<(u64, String), Tag>,
    }

    impl MockTagStore {
        fn new() -> Self {
            Self {
                tags: DashMap::new(),
            }
        }
    }

    #[async_trait]
    impl TagStore for MockTagStore {
        async fn get(&self, guild_id: u64, name: &str) -> Result<Option<Tag>, TagError> {
            Ok(self
                .tags
                .get(&(guild_id, name.to_string()))
                .map(|t| t.clone()))
        }

        async fn insert(&self, tag: Tag) -> Result<(), TagError> {
            self.tags
                .insert((tag.guild_id, tag.name.clone()), tag);
            Ok(())
        }

        async fn update_content(
            &self,
            guild_id: u64,
            name: &str,
            content: &str,
        ) -> Result<(), TagError> {
            if let Some(mut tag) = self.tags.get_mut(&(guild_id, name.to_string())) {
                tag.content = content.to_string();
            }
            Ok(())
        }

        async fn delete(&self, guild_id: u64, name: &str) -> Result<(), TagError> {
            self.tags.remove(&(guild_id, name.to_string()));
            Ok(())
        }

        async fn increment_uses(&self, guild_id: u64, name: &str) -> Result<(), TagError> {
            if let Some(mut tag) = self.tags.get_mut(&(guild_id, name.to_string())) {
                tag.uses += 1;
            }
            Ok(())
        }

        async fn names_sorted(
            &self,
            guild_id: u64,
            min_len: usize,
        ) -> Result<Vec<String>, TagError> {
            let mut names: Vec<String> = self
                .tags
                .iter()
                .filter(|t| t.guild_id == guild_id && t.name.len() > min_len)
                .map(|t| t.name.clone())
                .collect();
            names.sort();
            Ok(names)
        }

        async fn names_by_author(
            &self,
            guild_id: u64,
            author_id: u64,
        ) -> Result<Vec<String>, TagError> {
            let mut names: Vec<String> = self
                .tags
                .iter()
                .filter(|t| t.guild_id == guild_id && t.author_id == author_id)
                .map(|t| t.name.clone())
                .collect();
            names.sort();
            Ok(names)
        }

        async fn names_by_uses(
            &self,
            guild_id: u64,
            min_len: usize,
        ) -> Result<Vec<String>, TagError> {
            let mut tags: Vec<(u64, String)> = self
                .tags
                .iter()
                .filter(|t| t.guild_id == guild_id && t.name.len() > min_len)
                .map(|t| (t.uses, t.name.clone()))
                .collect();
            tags.sort_by(|a, b| b.0.cmp(&a.0));
            Ok(tags.into_iter().map(|(_, n)| n).collect())
        }

        async fn uses_counts(&self, guild_id: u64) -> Result<Vec<u64>, TagError> {
            Ok(self
                .tags
                .iter()
                .filter(|t| t.guild_id == guild_id)
                .map(|t| t.uses)
                .collect())
        }

        async fn random_name(&self, guild_id: u64) -> Result<Option<String>, TagError> {
            Ok(self
                .tags
                .iter()
                .find(|t| t.guild_id == guild_id)
                .map(|t| t.name.clone()))
        }
    }

    fn service() -> TagService<MockTagStore> {
        TagService::new(MockTagStore::new())
    }

    #[tokio::test]
    async fn duplicate_names_rejected_per_guild() {
        let tags = service();

        tags.create(1, 100, "foo", "bar").await.unwrap();
        let err = tags.create(1, 101, "foo", "baz").await.unwrap_err();
        assert!(matches!(err, TagError::AlreadyExists));

        // Same name in another guild is fine.
        tags.create(2, 101, "foo", "baz").await.unwrap();
    }

    #[tokio::test]
    async fn names_are_case_folded() {
        let tags = service();

        tags.create(1, 100, "Foo", "bar").await.unwrap();
        let err = tags.create(1, 100, "FOO", "other").await.unwrap_err();
        assert!(matches!(err, TagError::AlreadyExists));

        assert_eq!(tags.lookup(1, "fOo").await.unwrap(), Some("bar".into()));
    }

    #[tokio::test]
    async fn name_validation() {
        let tags = service();

        let err = tags.create(1, 100, "  ", "x").await.unwrap_err();
        assert!(matches!(err, TagError::MissingName));

        let long = "n".repeat(51);
        let err = tags.create(1, 100, &long, "x").await.unwrap_err();
        assert!(matches!(err, TagError::NameTooLong));

        let err = tags.create(1, 100, "hi @everyone", "x").await.unwrap_err();
        assert!(matches!(err, TagError::ReservedToken));
    }

    #[tokio::test]
    async fn content_mentions_are_defused() {
        let tags = service();
        tags.create(1, 100, "ping", "hello @everyone and @here")
            .await
            .unwrap();
        let content = tags.lookup(1, "ping").await.unwrap().unwrap();
        assert!(!content.contains("@everyone"));
        assert!(!content.contains("@here"));
        assert!(content.contains("@\u{200b}everyone"));
    }

    #[tokio::test]
    async fn lookup_increments_uses_and_misses_are_none() {
        let tags = service();
        tags.create(1, 100, "foo", "bar").await.unwrap();

        assert_eq!(tags.lookup(1, "foo").await.unwrap(), Some("bar".into()));
        assert_eq!(tags.lookup(1, "foo").await.unwrap(), Some("bar".into()));
        assert_eq!(tags.info(1, "foo").await.unwrap().tag.uses, 2);

        assert_eq!(tags.lookup(1, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn append_rejects_overlong_append() {
        let tags = service();
        tags.create(1, 100, "big", &"a".repeat(1995)).await.unwrap();

        // 1995 + newline + 10 exceeds 2000; the original length is reported.
        let err = tags.append(1, "big", &"b".repeat(10)).await.unwrap_err();
        match err {
            TagError::ContentTooLong { original_len } => assert_eq!(original_len, 1995),
            other => panic!("unexpected error: {other:?}"),
        }

        // 1995 + newline + 4 = 2000 still fits.
        tags.append(1, "big", &"b".repeat(4)).await.unwrap();
        let content = tags.lookup(1, "big").await.unwrap().unwrap();
        assert_eq!(content.chars().count(), 2000);
    }

    #[tokio::test]
    async fn edit_append_delete_require_existing_tag() {
        let tags = service();
        assert!(matches!(
            tags.edit(1, "ghost", "x").await.unwrap_err(),
            TagError::NotFound
        ));
        assert!(matches!(
            tags.append(1, "ghost", "x").await.unwrap_err(),
            TagError::NotFound
        ));
        assert!(matches!(
            tags.delete(1, "ghost").await.unwrap_err(),
            TagError::NotFound
        ));
    }

    #[tokio::test]
    async fn rank_counts_strictly_greater_uses() {
        let tags = service();
        for (name, uses) in [("a", 5), ("b", 3), ("c", 3), ("d", 1)] {
            tags.create(1, 100, name, "x").await.unwrap();
            for _ in 0..uses {
                tags.lookup(1, name).await.unwrap();
            }
        }

        assert_eq!(tags.info(1, "a").await.unwrap().rank, 1);
        // Known quirk: tied counts share a rank.
        assert_eq!(tags.info(1, "b").await.unwrap().rank, 2);
        assert_eq!(tags.info(1, "c").await.unwrap().rank, 2);
        assert_eq!(tags.info(1, "d").await.unwrap().rank, 4);
    }

    #[tokio::test]
    async fn search_requires_two_characters() {
        let tags = service();
        let err = tags.search(1, "a").await.unwrap_err();
        assert!(matches!(err, TagError::QueryTooShort));

        tags.create(1, 100, "rust", "x").await.unwrap();
        tags.create(1, 100, "trust", "x").await.unwrap();
        tags.create(1, 100, "other", "x").await.unwrap();
        let hits = tags.search(1, "RUST").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&"rust".to_string()));
        assert!(hits.contains(&"trust".to_string()));
    }

    #[tokio::test]
    async fn list_skips_short_names() {
        let tags = service();
        tags.create(1, 100, "ab", "x").await.unwrap();
        tags.create(1, 100, "abc", "x").await.unwrap();
        assert_eq!(tags.list(1).await.unwrap(), vec!["abc".to_string()]);
    }
}
