//! Shared event-log aggregation helpers for mission and badge conditions.

use sprout_core::{EventDetail, EventLogEntry, RewardKind};

/// Counts gacha plays, with a ten-pull counting as ten.
pub(crate) fn gacha_plays<'a>(events: impl Iterator<Item = &'a EventLogEntry>) -> i64 {
    events
        .map(|e| match e.detail {
            EventDetail::GachaPlay { .. } | EventDetail::GachaDuplicate { .. } => 1,
            EventDetail::GachaTenPull { .. } => 10,
            _ => 0,
        })
        .sum()
}

/// Sums all experience credited to the user: ingested gains, login bonuses,
/// experience-type mission rewards, and experience-type grants.
pub(crate) fn exp_credited<'a>(events: impl Iterator<Item = &'a EventLogEntry>) -> i64 {
    events
        .map(|e| match &e.detail {
            EventDetail::ExpGain { amount, .. } | EventDetail::LoginBonus { amount } => *amount,
            EventDetail::MissionClaim { reward: RewardKind::Exp, amount, .. }
            | EventDetail::PointGrant { kind: RewardKind::Exp, amount, .. } => *amount,
            _ => 0,
        })
        .sum()
}
