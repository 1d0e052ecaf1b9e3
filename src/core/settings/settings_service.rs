// Per-guild configuration: command prefix and mute role.
// No Discord dependencies here - just the settings rules and a storage port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix a guild gets before anyone configures one.
pub const DEFAULT_PREFIX: &str = ".";

// ============================================================================
// DOMAIN MODEL
// ============================================================================

/// Configuration row for a single guild.
///
/// Created lazily the first time a prefix is resolved for the guild and
/// never deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub guild_id: u64,
    pub prefix: String,
    pub mute_role_id: Option<u64>,
}

impl GuildSettings {
    pub fn with_defaults(guild_id: u64) -> Self {
        Self {
            guild_id,
            prefix: DEFAULT_PREFIX.to_string(),
            mute_role_id: None,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting guild settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Insert a default row if the guild has none, then return the stored
    /// settings. Must be idempotent: two racing calls for the same guild
    /// both land on the same single row.
    async fn get_or_init(&self, guild_id: u64) -> Result<GuildSettings, SettingsError>;

    /// Read the settings row without provisioning one.
    async fn get(&self, guild_id: u64) -> Result<Option<GuildSettings>, SettingsError>;

    async fn set_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), SettingsError>;

    async fn set_mute_role(&self, guild_id: u64, role_id: u64) -> Result<(), SettingsError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct SettingsService<S: SettingsStore> {
    store: S,
}

impl<S: SettingsStore> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve the active prefix for a guild.
    ///
    /// This is a side-effecting read: the first resolution for a guild
    /// provisions its settings row with the default prefix.
    pub async fn prefix_for(&self, guild_id: u64) -> Result<String, SettingsError> {
        Ok(self.store.get_or_init(guild_id).await?.prefix)
    }

    /// The prefix as stored, without provisioning a row. Used by the
    /// `prefix` display command, which reports the default for unseen guilds.
    pub async fn current_prefix(&self, guild_id: u64) -> Result<Option<String>, SettingsError> {
        Ok(self.store.get(guild_id).await?.map(|s| s.prefix))
    }

    pub async fn set_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), SettingsError> {
        self.store.get_or_init(guild_id).await?;
        self.store.set_prefix(guild_id, prefix).await
    }

    pub async fn mute_role(&self, guild_id: u64) -> Result<Option<u64>, SettingsError> {
        Ok(self.store.get(guild_id).await?.and_then(|s| s.mute_role_id))
    }

    /// Remember which role acts as the guild's mute role. Also called to
    /// memoize a role that was found by name or freshly created.
    pub async fn set_mute_role(&self, guild_id: u64, role_id: u64) -> Result<(), SettingsError> {
        self.store.get_or_init(guild_id).await?;
        self.store.set_mute_role(guild_id, role_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    /// In-memory store for testing
    struct MockSettingsStore {
        rows: DashMap<u64, GuildSettings>,
        inserts: DashMap<u64, u32>,
    }

    impl MockSettingsStore {
        fn new() -> Self {
            Self {
                rows: DashMap::new(),
                inserts: DashMap::new(),
            }
        }
    }

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn get_or_init(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
            let row = self
                .rows
                .entry(guild_id)
                .or_insert_with(|| {
                    *self.inserts.entry(guild_id).or_insert(0) += 1;
                    GuildSettings::with_defaults(guild_id)
                })
                .clone();
            Ok(row)
        }

        async fn get(&self, guild_id: u64) -> Result<Option<GuildSettings>, SettingsError> {
            Ok(self.rows.get(&guild_id).map(|r| r.clone()))
        }

        async fn set_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), SettingsError> {
            if let Some(mut row) = self.rows.get_mut(&guild_id) {
                row.prefix = prefix.to_string();
            }
            Ok(())
        }

        async fn set_mute_role(&self, guild_id: u64, role_id: u64) -> Result<(), SettingsError> {
            if let Some(mut row) = self.rows.get_mut(&guild_id) {
                row.mute_role_id = Some(role_id);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_resolution_provisions_default_row() {
        let store = MockSettingsStore::new();
        let service = SettingsService::new(store);

        let prefix = service.prefix_for(42).await.unwrap();
        assert_eq!(prefix, DEFAULT_PREFIX);

        assert_eq!(*service.store.inserts.get(&42).unwrap(), 1);
        assert_eq!(service.store.rows.len(), 1);
    }

    #[tokio::test]
    async fn repeated_resolution_does_not_duplicate() {
        let store = MockSettingsStore::new();
        let service = SettingsService::new(store);

        service.set_prefix(42, "!").await.unwrap();
        let prefix = service.prefix_for(42).await.unwrap();
        assert_eq!(prefix, "!");

        // Only the lazy provisioning inside set_prefix inserted a row.
        assert_eq!(*service.store.inserts.get(&42).unwrap(), 1);
        assert_eq!(service.store.rows.len(), 1);
    }

    #[tokio::test]
    async fn display_does_not_provision() {
        let store = MockSettingsStore::new();
        let service = SettingsService::new(store);

        assert_eq!(service.current_prefix(42).await.unwrap(), None);
        assert!(service.store.rows.is_empty());
    }

    #[tokio::test]
    async fn mute_role_roundtrip() {
        let store = MockSettingsStore::new();
        let service = SettingsService::new(store);

        assert_eq!(service.mute_role(42).await.unwrap(), None);
        service.set_mute_role(42, 7).await.unwrap();
        assert_eq!(service.mute_role(42).await.unwrap(), Some(7));
        // The prefix survives the mute role update untouched.
        assert_eq!(service.prefix_for(42).await.unwrap(), DEFAULT_PREFIX);
    }
}
