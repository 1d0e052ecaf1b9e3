// Moderation business logic: the hierarchy gate in front of every action
// and the append-only moderation log behind it.

use super::moderation_models::{HierarchyVerdict, ModAction, ModerationRecord, RoleStanding};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for the moderation log. Records are only ever appended.
#[async_trait]
pub trait ModLogStore: Send + Sync {
    async fn append(&self, record: ModerationRecord) -> Result<(), ModerationError>;

    /// A member's records in one guild, oldest first.
    async fn history(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<ModerationRecord>, ModerationError>;
}

// ============================================================================
// HIERARCHY GATE
// ============================================================================

/// The three-tier gate run before every moderation action:
/// owner check, then actor vs target, then bot vs target.
///
/// The guild owner bypasses the actor comparison but never the bot one;
/// equal top roles count as outranked.
pub fn check_hierarchy(
    actor: RoleStanding,
    target: RoleStanding,
    bot_top_role: u16,
) -> HierarchyVerdict {
    if target.is_owner {
        return HierarchyVerdict::TargetIsOwner;
    }
    if !actor.is_owner && target.top_role >= actor.top_role {
        return HierarchyVerdict::ActorOutranked;
    }
    if target.top_role >= bot_top_role {
        return HierarchyVerdict::BotOutranked;
    }
    HierarchyVerdict::Allowed
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<S: ModLogStore> {
    store: S,
}

impl<S: ModLogStore> ModerationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append one record for an applied action.
    pub async fn record(
        &self,
        guild_id: u64,
        user_id: u64,
        mod_id: u64,
        action: ModAction,
        reason: &str,
    ) -> Result<(), ModerationError> {
        self.store
            .append(ModerationRecord {
                guild_id,
                user_id,
                mod_id,
                action,
                reason: reason.to_string(),
                date: Utc::now(),
            })
            .await
    }

    pub async fn history(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<ModerationRecord>, ModerationError> {
        self.store.history(guild_id, user_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    /// In-memory log for testing
    struct MockModLogStore {
        records: DashMap<u64, Vec<ModerationRecord>>,
    }

    impl MockModLogStore {
        fn new() -> Self {
            Self {
                records: DashMap::new(),
            }
        }
    }

    #[async_trait]
    impl ModLogStore for MockModLogStore {
        async fn append(&self, record: ModerationRecord) -> Result<(), ModerationError> {
            self.records
                .entry(record.guild_id)
                .or_default()
                .push(record);
            Ok(())
        }

        async fn history(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<Vec<ModerationRecord>, ModerationError> {
            Ok(self
                .records
                .get(&guild_id)
                .map(|r| {
                    r.iter()
                        .filter(|rec| rec.user_id == user_id)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    fn member(top_role: u16) -> RoleStanding {
        RoleStanding::new(false, top_role)
    }

    #[test]
    fn owner_target_always_rejected() {
        let owner = RoleStanding::new(true, 1);
        let verdict = check_hierarchy(member(9), owner, 10);
        assert_eq!(verdict, HierarchyVerdict::TargetIsOwner);
    }

    #[test]
    fn actor_must_outrank_target() {
        // Actor above, bot above: allowed.
        let verdict = check_hierarchy(member(5), member(3), 10);
        assert_eq!(verdict, HierarchyVerdict::Allowed);

        // Target at or above the actor: rejected.
        let verdict = check_hierarchy(member(3), member(5), 10);
        assert_eq!(verdict, HierarchyVerdict::ActorOutranked);
        let verdict = check_hierarchy(member(3), member(3), 10);
        assert_eq!(verdict, HierarchyVerdict::ActorOutranked);
    }

    #[test]
    fn bot_must_outrank_target() {
        let verdict = check_hierarchy(member(9), member(5), 5);
        assert_eq!(verdict, HierarchyVerdict::BotOutranked);
    }

    #[test]
    fn owner_actor_bypasses_actor_check_only() {
        let owner = RoleStanding::new(true, 0);
        // Owner may act on someone above them, as long as the bot outranks.
        let verdict = check_hierarchy(owner, member(5), 10);
        assert_eq!(verdict, HierarchyVerdict::Allowed);
        // The bot comparison still applies to the owner.
        let verdict = check_hierarchy(owner, member(5), 5);
        assert_eq!(verdict, HierarchyVerdict::BotOutranked);
    }

    #[tokio::test]
    async fn applied_action_appends_one_record() {
        let service = ModerationService::new(MockModLogStore::new());

        let verdict = check_hierarchy(
            member(5),
            member(3),
            10,
        );
        assert_eq!(verdict, HierarchyVerdict::Allowed);
        service
            .record(1, 200, 100, ModAction::Kick, "No reason provided")
            .await
            .unwrap();

        let history = service.history(1, 200).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, ModAction::Kick);
        assert_eq!(history[0].mod_id, 100);
    }

    #[tokio::test]
    async fn rejected_action_appends_nothing() {
        let service = ModerationService::new(MockModLogStore::new());

        let verdict = check_hierarchy(
            member(3),
            member(5),
            10,
        );
        assert_ne!(verdict, HierarchyVerdict::Allowed);
        // The command layer only records on Allowed, so nothing to append.

        assert!(service.history(1, 200).await.unwrap().is_empty());
    }

    #[test]
    fn action_strings_roundtrip() {
        for action in [
            ModAction::Warn,
            ModAction::Kick,
            ModAction::Ban,
            ModAction::Softban,
            ModAction::Mute,
            ModAction::Unmute,
        ] {
            assert_eq!(ModAction::from_str_lossy(action.as_str()), Some(action));
        }
        assert_eq!(ModAction::from_str_lossy("Yeet"), None);
    }
}
