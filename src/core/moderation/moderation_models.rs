// Moderation domain models - pure domain types with no Discord dependencies.
// The discord layer converts verdicts into replies and platform calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of action a moderator invoked. One log record is written per
/// applied action (per member, for the bulk commands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModAction {
    Warn,
    Kick,
    Ban,
    Softban,
    Mute,
    Unmute,
}

impl ModAction {
    /// Stable string form used in the log table.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModAction::Warn => "Warn",
            ModAction::Kick => "Kick",
            ModAction::Ban => "Ban",
            ModAction::Softban => "Softban",
            ModAction::Mute => "Mute",
            ModAction::Unmute => "Unmute",
        }
    }

    pub fn from_str_lossy(s: &str) -> Option<Self> {
        match s {
            "Warn" => Some(ModAction::Warn),
            "Kick" => Some(ModAction::Kick),
            "Ban" => Some(ModAction::Ban),
            "Softban" => Some(ModAction::Softban),
            "Mute" => Some(ModAction::Mute),
            "Unmute" => Some(ModAction::Unmute),
            _ => None,
        }
    }

    /// Past tense, for acknowledgements and DM notices.
    pub fn done(&self) -> &'static str {
        match self {
            ModAction::Warn => "Warned",
            ModAction::Kick => "Kicked",
            ModAction::Ban => "Banned",
            ModAction::Softban => "Softbanned",
            ModAction::Mute => "Muted",
            ModAction::Unmute => "Unmuted",
        }
    }

    /// Lowercase verb, for rejection messages ("Cannot kick the owner").
    pub fn verb(&self) -> &'static str {
        match self {
            ModAction::Warn => "warn",
            ModAction::Kick => "kick",
            ModAction::Ban => "ban",
            ModAction::Softban => "softban",
            ModAction::Mute => "mute",
            ModAction::Unmute => "unmute",
        }
    }
}

impl std::fmt::Display for ModAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One appended entry in a guild's moderation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub guild_id: u64,
    /// The member the action was taken against.
    pub user_id: u64,
    /// The moderator who invoked the command.
    pub mod_id: u64,
    pub action: ModAction,
    pub reason: String,
    pub date: DateTime<Utc>,
}

/// A member's place in the role hierarchy, snapshotted from the gateway
/// cache right before the gate runs.
#[derive(Debug, Clone, Copy)]
pub struct RoleStanding {
    pub is_owner: bool,
    /// Position of the member's highest role. Higher position = higher role;
    /// 0 when the member only has @everyone.
    pub top_role: u16,
}

impl RoleStanding {
    pub fn new(is_owner: bool, top_role: u16) -> Self {
        Self { is_owner, top_role }
    }
}

/// Outcome of the three-tier hierarchy check. Only `Allowed` may proceed to
/// a platform mutation and a log record; the rejections are terminal no-ops
/// besides the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyVerdict {
    Allowed,
    /// The guild owner is untouchable.
    TargetIsOwner,
    /// The target's top role is at or above the actor's.
    ActorOutranked,
    /// The target's top role is at or above the bot's.
    BotOutranked,
}
