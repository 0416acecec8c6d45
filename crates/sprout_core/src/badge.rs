//! Badge definitions and earned-badge records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Unique identifier for a badge definition.
pub type BadgeId = String;

/// A badge catalog entry. Static and read-only from the engine's
/// perspective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    /// Unique identifier.
    pub id: BadgeId,
    /// Raw condition key. Parsed by the badge engine; unknown keys never
    /// award.
    pub condition: String,
    /// Threshold the condition's value must reach.
    pub threshold: i64,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
}

/// An awarded badge. Append-only, at most one per (user, badge).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    /// The user who earned it.
    pub user: UserId,
    /// The badge that was earned.
    pub badge_id: BadgeId,
    /// When it was awarded.
    pub at: NaiveDateTime,
}
