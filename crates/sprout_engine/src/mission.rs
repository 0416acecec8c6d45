//! # Mission Engine
//!
//! Evaluates daily/weekly/cooperative mission definitions against the event
//! log and handles reward claims.
//!
//! Windows are computed from `now`: daily missions cover today (local
//! midnight to now); weekly and cooperative missions cover the week
//! containing now, Monday 00:00:00 through Sunday 23:59:59 - not a rolling
//! seven days. Cooperative progress aggregates over all users.
//!
//! Claim state is derived from claim events in the same window whose typed
//! `mission_id` field matches - the structured field is the sole persistent
//! record, so no message template can ever break claim detection.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;

use sprout_core::{Cadence, EventDetail, EventLogEntry, MissionId, RewardKind};
use sprout_store::GameStore;

use crate::error::{EngineError, EngineResult};
use crate::tally;

/// A parsed mission condition key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissionCondition {
    /// Number of login bonuses in the window.
    LoginCount,
    /// Number of gacha plays in the window (a ten-pull counts as ten).
    GachaPlays,
    /// Typing practice completions ingested in the window.
    TypingCompletions,
    /// Arithmetic drill completions ingested in the window.
    DrillCompletions,
    /// Total experience credited in the window.
    ExpEarned,
    /// Exchange-point purchases in the window.
    ExchangeCount,
}

impl MissionCondition {
    /// Parses a raw condition key. Keys are trimmed; empty or unknown keys
    /// yield `None`, which excludes the definition from results entirely.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "login_count" => Some(Self::LoginCount),
            "gacha_plays" => Some(Self::GachaPlays),
            "typing_completions" => Some(Self::TypingCompletions),
            "drill_completions" => Some(Self::DrillCompletions),
            "exp_earned" => Some(Self::ExpEarned),
            "exchange_count" => Some(Self::ExchangeCount),
            _ => None,
        }
    }

    fn progress(self, events: &[EventLogEntry], user: &str, window: (NaiveDateTime, NaiveDateTime), everyone: bool) -> i64 {
        let (start, end) = window;
        let scoped = events
            .iter()
            .filter(|e| e.at >= start && e.at <= end && (everyone || e.user == user));
        let checked = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        match self {
            Self::LoginCount => checked(
                scoped.filter(|e| matches!(e.detail, EventDetail::LoginBonus { .. })).count(),
            ),
            Self::GachaPlays => tally::gacha_plays(scoped),
            Self::TypingCompletions => {
                checked(scoped.filter(|e| e.detail == EventDetail::TypingCompleted).count())
            }
            Self::DrillCompletions => {
                checked(scoped.filter(|e| e.detail == EventDetail::DrillCompleted).count())
            }
            Self::ExpEarned => tally::exp_credited(scoped),
            Self::ExchangeCount => checked(
                scoped.filter(|e| matches!(e.detail, EventDetail::ItemExchange { .. })).count(),
            ),
        }
    }
}

/// User-facing mission state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissionStatus {
    /// Mission identifier.
    pub id: MissionId,
    /// Display title.
    pub title: String,
    /// Window cadence.
    pub cadence: Cadence,
    /// Progress within the window, capped at `target` for display.
    pub progress: i64,
    /// Completion target.
    pub target: i64,
    /// Whether progress reached the target.
    pub is_complete: bool,
    /// Whether the reward was already claimed within the window.
    pub is_claimed: bool,
    /// What claiming credits.
    pub reward: RewardKind,
    /// How much claiming credits.
    pub amount: i64,
}

/// Computes the evaluation window for a cadence.
///
/// Returns `(start, end)`, both inclusive. Daily windows end at `now`;
/// weekly and cooperative windows end at Sunday 23:59:59 of the week
/// containing `now`.
#[must_use]
pub fn mission_window(cadence: Cadence, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    match cadence {
        Cadence::Daily => (now.date().and_time(NaiveTime::MIN), now),
        Cadence::Weekly | Cadence::Cooperative => {
            let days_from_monday = i64::from(now.date().weekday().num_days_from_monday());
            let monday = now.date() - Duration::days(days_from_monday);
            let start = monday.and_time(NaiveTime::MIN);
            let end = start + Duration::days(7) - Duration::seconds(1);
            (start, end)
        }
    }
}

fn is_claimed(events: &[EventLogEntry], user: &str, mission_id: &str, window: (NaiveDateTime, NaiveDateTime)) -> bool {
    let (start, end) = window;
    events.iter().any(|e| {
        e.user == user
            && e.at >= start
            && e.at <= end
            && matches!(&e.detail, EventDetail::MissionClaim { mission_id: id, .. } if id == mission_id)
    })
}

/// Evaluates all enabled, well-formed mission definitions for a user.
///
/// Disabled definitions and definitions with an empty or unknown condition
/// key do not appear in the result at all.
///
/// # Errors
///
/// Returns an error when the mission catalog or the event log is
/// unreadable.
pub fn check_missions(
    store: &dyn GameStore,
    user: &str,
    now: NaiveDateTime,
) -> EngineResult<Vec<MissionStatus>> {
    let definitions = store.missions()?;
    let events = store.events()?;

    let mut statuses = Vec::new();
    for def in definitions {
        if !def.enabled {
            continue;
        }
        let Some(condition) = MissionCondition::from_key(&def.condition) else {
            continue;
        };

        let window = mission_window(def.cadence, now);
        let everyone = def.cadence == Cadence::Cooperative;
        let progress = condition.progress(&events, user, window, everyone);

        statuses.push(MissionStatus {
            is_complete: progress >= def.target,
            is_claimed: is_claimed(&events, user, &def.id, window),
            progress: progress.min(def.target),
            id: def.id,
            title: def.title,
            cadence: def.cadence,
            target: def.target,
            reward: def.reward,
            amount: def.amount,
        });
    }
    Ok(statuses)
}

/// Claims a completed mission's reward.
///
/// Re-validates completeness and unclaimed state server-side; the client's
/// view is never trusted. The mission id is trimmed to tolerate whitespace.
/// On success the reward is credited, the user written back, and a claim
/// event carrying the mission id appended.
///
/// # Errors
///
/// [`EngineError::MissionNotFound`] when no enabled, well-formed definition
/// matches; [`EngineError::MissionNotComplete`] when progress is short;
/// [`EngineError::MissionAlreadyClaimed`] when a claim event already exists
/// in the window; [`EngineError::UserNotFound`] for an unknown user.
pub fn claim_mission_reward(
    store: &mut dyn GameStore,
    user_id: &str,
    mission_id: &str,
    now: NaiveDateTime,
) -> EngineResult<MissionStatus> {
    let mission_id = mission_id.trim();

    let def = store
        .missions()?
        .into_iter()
        .filter(|d| d.enabled)
        .find(|d| d.id == mission_id)
        .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;
    let condition = MissionCondition::from_key(&def.condition)
        .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;

    let events = store.events()?;
    let window = mission_window(def.cadence, now);
    let everyone = def.cadence == Cadence::Cooperative;
    let progress = condition.progress(&events, user_id, window, everyone);

    if progress < def.target {
        return Err(EngineError::MissionNotComplete(def.id.clone()));
    }
    if is_claimed(&events, user_id, &def.id, window) {
        return Err(EngineError::MissionAlreadyClaimed(def.id.clone()));
    }

    let mut user = store
        .user(user_id)?
        .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
    match def.reward {
        RewardKind::Exp => user.credit_exp(def.amount),
        RewardKind::Points => user.exchange_points += def.amount,
    }
    store.put_user(user)?;
    store.append_events(vec![EventLogEntry::new(
        now,
        user_id.to_string(),
        EventDetail::MissionClaim {
            mission_id: def.id.clone(),
            reward: def.reward,
            amount: def.amount,
        },
    )])?;

    Ok(MissionStatus {
        progress: def.target,
        is_complete: true,
        is_claimed: true,
        id: def.id,
        title: def.title,
        cadence: def.cadence,
        target: def.target,
        reward: def.reward,
        amount: def.amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_core::{MissionDefinition, SourceKind, User};
    use sprout_store::MemoryStore;

    // 2024-06-05 is a Wednesday.
    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 5).unwrap().and_hms_opt(15, 0, 0).unwrap()
    }

    fn daily_typing_mission(target: i64) -> MissionDefinition {
        MissionDefinition {
            id: "m-typing".to_string(),
            title: "Typing today".to_string(),
            cadence: Cadence::Daily,
            condition: "typing_completions".to_string(),
            target,
            reward: RewardKind::Points,
            amount: 30,
            enabled: true,
        }
    }

    fn log(store: &mut MemoryStore, user: &str, at: NaiveDateTime, detail: EventDetail) {
        store.append_events(vec![EventLogEntry::new(at, user.to_string(), detail)]).unwrap();
    }

    #[test]
    fn test_window_daily_and_weekly() {
        let (start, end) = mission_window(Cadence::Daily, now());
        assert_eq!(start.to_string(), "2024-06-05 00:00:00");
        assert_eq!(end, now());

        let (start, end) = mission_window(Cadence::Weekly, now());
        assert_eq!(start.to_string(), "2024-06-03 00:00:00"); // Monday
        assert_eq!(end.to_string(), "2024-06-09 23:59:59"); // Sunday
    }

    #[test]
    fn test_progress_capped_and_completion() {
        let mut store = MemoryStore::new();
        store.seed_mission(daily_typing_mission(2));
        for _ in 0..3 {
            log(&mut store, "a@school", now(), EventDetail::TypingCompleted);
        }
        // Yesterday's completion is outside the daily window.
        log(
            &mut store,
            "a@school",
            now() - Duration::days(1),
            EventDetail::TypingCompleted,
        );

        let statuses = check_missions(&store, "a@school", now()).unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].progress, 2); // capped at target
        assert!(statuses[0].is_complete);
        assert!(!statuses[0].is_claimed);
    }

    #[test]
    fn test_disabled_and_unknown_conditions_excluded() {
        let mut store = MemoryStore::new();
        let mut disabled = daily_typing_mission(1);
        disabled.enabled = false;
        store.seed_mission(disabled);
        let mut blank = daily_typing_mission(1);
        blank.id = "m-blank".to_string();
        blank.condition = "  ".to_string();
        store.seed_mission(blank);

        assert!(check_missions(&store, "a@school", now()).unwrap().is_empty());
    }

    #[test]
    fn test_cooperative_counts_all_users() {
        let mut store = MemoryStore::new();
        store.seed_mission(MissionDefinition {
            id: "m-coop".to_string(),
            title: "Class typing".to_string(),
            cadence: Cadence::Cooperative,
            condition: "typing_completions".to_string(),
            target: 2,
            reward: RewardKind::Exp,
            amount: 50,
            enabled: true,
        });
        log(&mut store, "a@school", now(), EventDetail::TypingCompleted);
        log(&mut store, "b@school", now(), EventDetail::TypingCompleted);

        let statuses = check_missions(&store, "a@school", now()).unwrap();
        assert!(statuses[0].is_complete);
    }

    #[test]
    fn test_exp_earned_sums_structured_amounts() {
        let mut store = MemoryStore::new();
        store.seed_mission(MissionDefinition {
            id: "m-exp".to_string(),
            title: "Earn 100 EXP".to_string(),
            cadence: Cadence::Daily,
            condition: "exp_earned".to_string(),
            target: 100,
            reward: RewardKind::Points,
            amount: 20,
            enabled: true,
        });
        log(
            &mut store,
            "a@school",
            now(),
            EventDetail::ExpGain { amount: 60, source: SourceKind::ReadingLog },
        );
        log(&mut store, "a@school", now(), EventDetail::LoginBonus { amount: 40 });

        let statuses = check_missions(&store, "a@school", now()).unwrap();
        assert_eq!(statuses[0].progress, 100);
        assert!(statuses[0].is_complete);
    }

    #[test]
    fn test_claim_credits_and_marks_claimed() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        store.seed_mission(daily_typing_mission(1));
        log(&mut store, "a@school", now(), EventDetail::TypingCompleted);

        let status = claim_mission_reward(&mut store, "a@school", " m-typing ", now()).unwrap();
        assert!(status.is_claimed);

        let user = store.user("a@school").unwrap().unwrap();
        assert_eq!(user.exchange_points, 30);

        // The claim is now visible to the next check within the window.
        let statuses = check_missions(&store, "a@school", now()).unwrap();
        assert!(statuses[0].is_claimed);
    }

    #[test]
    fn test_claim_rejected_when_incomplete_or_repeated() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        store.seed_mission(daily_typing_mission(1));

        // Incomplete, even if the client asserts otherwise.
        let err = claim_mission_reward(&mut store, "a@school", "m-typing", now()).unwrap_err();
        assert!(matches!(err, EngineError::MissionNotComplete(_)));

        log(&mut store, "a@school", now(), EventDetail::TypingCompleted);
        claim_mission_reward(&mut store, "a@school", "m-typing", now()).unwrap();

        let err = claim_mission_reward(&mut store, "a@school", "m-typing", now()).unwrap_err();
        assert!(matches!(err, EngineError::MissionAlreadyClaimed(_)));

        // Only the first claim credited.
        let user = store.user("a@school").unwrap().unwrap();
        assert_eq!(user.exchange_points, 30);
    }

    #[test]
    fn test_claim_unknown_mission() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        let err = claim_mission_reward(&mut store, "a@school", "nope", now()).unwrap_err();
        assert!(matches!(err, EngineError::MissionNotFound(_)));
    }
}
