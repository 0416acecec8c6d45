//! Mission definitions.

use serde::{Deserialize, Serialize};

/// Unique identifier for a mission definition.
pub type MissionId = String;

/// How a mission's progress window is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// Window is today, local midnight to now.
    Daily,
    /// Window is the week containing now, Monday 00:00:00 through
    /// Sunday 23:59:59.
    Weekly,
    /// Weekly window, but progress aggregates over all users.
    Cooperative,
}

/// What a mission or grant credits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    /// Experience - credits both the cumulative total and the spendable
    /// balance.
    Exp,
    /// Exchange points.
    Points,
}

/// A mission catalog entry. Static and read-only from the engine's
/// perspective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionDefinition {
    /// Unique identifier.
    pub id: MissionId,
    /// Display title.
    pub title: String,
    /// Window cadence.
    pub cadence: Cadence,
    /// Raw condition key. Parsed by the mission engine; definitions whose
    /// key is empty or unknown are excluded from results entirely.
    pub condition: String,
    /// Progress value at which the mission completes.
    pub target: i64,
    /// What claiming credits.
    pub reward: RewardKind,
    /// How much claiming credits.
    pub amount: i64,
    /// Disabled definitions are excluded from results entirely.
    pub enabled: bool,
}
