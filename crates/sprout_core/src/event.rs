//! # Structured Event Log
//!
//! Append-only, totally ordered record of user actions. Every entry carries
//! typed fields; the rendered display string is derived from those fields by
//! [`EventDetail::render_message`] and is never parsed back. Mission
//! progress, claim detection, and level-up history all read the typed
//! fields directly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::item::ItemId;
use crate::mission::{MissionId, RewardKind};
use crate::record::SourceKind;
use crate::user::UserId;

/// Discriminator for event log entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Daily login bonus credited.
    LoginBonus,
    /// Experience credited from an ingested learning record.
    ExpGain,
    /// Level increased during a batch commit.
    LevelUp,
    /// Item purchased with exchange points.
    ItemExchange,
    /// Single gacha draw.
    GachaPlay,
    /// Gacha draw that hit an owned item and converted to points.
    GachaDuplicate,
    /// Ten-pull gacha play. Counts as ten plays for condition checks.
    GachaTenPull,
    /// Mission reward claimed.
    MissionClaim,
    /// Badge awarded.
    BadgeAward,
    /// Avatar composition saved.
    AvatarSave,
    /// Profile fields saved.
    ProfileSave,
    /// Teacher granted points or experience.
    PointGrant,
    /// Internal completion marker: a typing practice row was ingested.
    /// Used only for mission counting, not shown in activity feeds.
    TypingCompleted,
    /// Internal completion marker: an arithmetic drill row was ingested.
    DrillCompleted,
}

/// Typed payload of an event log entry, one variant per [`EventKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDetail {
    /// Daily login bonus.
    LoginBonus {
        /// Experience credited.
        amount: i64,
    },
    /// Experience from an ingested learning record.
    ExpGain {
        /// Experience credited.
        amount: i64,
        /// Which sheet the record came from.
        source: SourceKind,
    },
    /// Level increase detected at batch commit.
    LevelUp {
        /// The level reached.
        new_level: u32,
    },
    /// Direct purchase with exchange points.
    ItemExchange {
        /// The purchased item.
        item_id: ItemId,
        /// Points spent.
        cost: i64,
    },
    /// Single gacha draw. Logged for every single play, duplicate or not.
    GachaPlay {
        /// The drawn item.
        item_id: ItemId,
    },
    /// A draw converted to exchange points because the item was owned.
    GachaDuplicate {
        /// The duplicate item.
        item_id: ItemId,
        /// Points credited for the conversion.
        points: i64,
    },
    /// Ten-pull summary. The bundle logs exactly this one entry; in-batch
    /// duplicates are counted in its fields, never as separate
    /// [`EventDetail::GachaDuplicate`] entries.
    GachaTenPull {
        /// Items added to the inventory.
        new_items: u32,
        /// Draws converted to points.
        duplicates: u32,
    },
    /// Mission reward claim. The mission id here is the sole persistent
    /// record the next claimed-check reads.
    MissionClaim {
        /// The claimed mission.
        mission_id: MissionId,
        /// What was credited.
        reward: RewardKind,
        /// How much was credited.
        amount: i64,
    },
    /// Badge award.
    BadgeAward {
        /// The awarded badge.
        badge_id: String,
        /// Display name at award time.
        badge_name: String,
    },
    /// Avatar composition saved.
    AvatarSave,
    /// Profile fields saved.
    ProfileSave,
    /// Teacher grant.
    PointGrant {
        /// What was credited.
        kind: RewardKind,
        /// How much was credited.
        amount: i64,
        /// Free-text reason supplied by the teacher.
        reason: String,
    },
    /// Completion marker for a typing practice row.
    TypingCompleted,
    /// Completion marker for an arithmetic drill row.
    DrillCompleted,
}

impl EventDetail {
    /// Returns the discriminator for this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::LoginBonus { .. } => EventKind::LoginBonus,
            Self::ExpGain { .. } => EventKind::ExpGain,
            Self::LevelUp { .. } => EventKind::LevelUp,
            Self::ItemExchange { .. } => EventKind::ItemExchange,
            Self::GachaPlay { .. } => EventKind::GachaPlay,
            Self::GachaDuplicate { .. } => EventKind::GachaDuplicate,
            Self::GachaTenPull { .. } => EventKind::GachaTenPull,
            Self::MissionClaim { .. } => EventKind::MissionClaim,
            Self::BadgeAward { .. } => EventKind::BadgeAward,
            Self::AvatarSave => EventKind::AvatarSave,
            Self::ProfileSave => EventKind::ProfileSave,
            Self::PointGrant { .. } => EventKind::PointGrant,
            Self::TypingCompleted => EventKind::TypingCompleted,
            Self::DrillCompleted => EventKind::DrillCompleted,
        }
    }

    /// Internal completion markers exist only for mission counting and are
    /// hidden from activity feeds.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::TypingCompleted | Self::DrillCompleted)
    }

    /// Renders the display string for activity feeds.
    ///
    /// Purely presentational: nothing ever parses this string back.
    #[must_use]
    pub fn render_message(&self) -> String {
        match self {
            Self::LoginBonus { amount } => format!("Login bonus: +{amount} EXP"),
            Self::ExpGain { amount, source } => {
                format!("+{amount} EXP from {}", source.label())
            }
            Self::LevelUp { new_level } => format!("Reached level {new_level}!"),
            Self::ItemExchange { item_id, cost } => {
                format!("Exchanged {cost} points for {item_id}")
            }
            Self::GachaPlay { item_id } => format!("Gacha: got {item_id}"),
            Self::GachaDuplicate { item_id, points } => {
                format!("Gacha: duplicate {item_id}, converted to {points} points")
            }
            Self::GachaTenPull { new_items, duplicates } => {
                format!("10x gacha: {new_items} new, {duplicates} duplicates")
            }
            Self::MissionClaim { mission_id, amount, reward } => {
                let unit = match reward {
                    RewardKind::Exp => "EXP",
                    RewardKind::Points => "points",
                };
                format!("Mission {mission_id} cleared: +{amount} {unit}")
            }
            Self::BadgeAward { badge_name, .. } => format!("Earned badge: {badge_name}"),
            Self::AvatarSave => "Saved avatar".to_string(),
            Self::ProfileSave => "Saved profile".to_string(),
            Self::PointGrant { kind, amount, reason } => {
                let unit = match kind {
                    RewardKind::Exp => "EXP",
                    RewardKind::Points => "points",
                };
                format!("Granted +{amount} {unit} ({reason})")
            }
            Self::TypingCompleted => "Typing practice completed".to_string(),
            Self::DrillCompleted => "Arithmetic drill completed".to_string(),
        }
    }
}

/// One entry of the append-only event log.
///
/// Total order is by `seq`, assigned by the store on append; `at` carries
/// the wall-clock time for window filtering. Entries are never mutated or
/// deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Append sequence number, assigned by the store.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: NaiveDateTime,
    /// The acting user.
    pub user: UserId,
    /// Typed payload.
    pub detail: EventDetail,
}

impl EventLogEntry {
    /// Builds an entry with an unassigned sequence number. The store assigns
    /// the real `seq` on append.
    #[must_use]
    pub const fn new(at: NaiveDateTime, user: UserId, detail: EventDetail) -> Self {
        Self { seq: 0, at, user, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_detail() {
        let detail = EventDetail::MissionClaim {
            mission_id: "m-daily-1".to_string(),
            reward: RewardKind::Points,
            amount: 30,
        };
        assert_eq!(detail.kind(), EventKind::MissionClaim);
        assert!(!detail.is_internal());
        assert!(EventDetail::TypingCompleted.is_internal());
    }

    #[test]
    fn test_render_is_presentation_only() {
        let detail = EventDetail::ExpGain { amount: 42, source: SourceKind::ReadingLog };
        assert_eq!(detail.render_message(), "+42 EXP from reading log");
    }
}
