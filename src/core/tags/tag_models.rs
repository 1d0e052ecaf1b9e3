// Tag domain models - pure data, no Discord dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored tag. `name` is kept lowercased and trimmed; `(guild_id, name)`
/// is unique within the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub guild_id: u64,
    pub author_id: u64,
    /// Approximate popularity counter. Incremented on every successful
    /// lookup; concurrent lookups may lose an update, which is acceptable.
    pub uses: u64,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Everything `tag info` shows: the tag plus its popularity rank within
/// the guild.
#[derive(Debug, Clone)]
pub struct TagInfo {
    pub tag: Tag,
    /// 1 + the number of tags in the same guild with strictly more uses.
    /// Tied tags share a rank; no tie-breaking is applied.
    pub rank: usize,
}
