//! # Badge Engine
//!
//! Evaluates the badge catalog against a user's full history and awards
//! each badge at most once. Conditions are keys, optionally parameterized
//! with a `:` suffix; a definition whose key doesn't parse simply never
//! awards - a typo in the catalog must not take the whole check down.
//!
//! Awards are exactly-once: the earned list is consulted before every
//! evaluation, and an awarded badge is appended with a timestamp plus an
//! award event. Nothing ever un-awards.

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use sprout_core::{
    BadgeDefinition, EarnedBadge, EventDetail, EventKind, EventLogEntry, Settings, SourceKind,
};
use sprout_store::GameStore;

use crate::error::{EngineError, EngineResult};
use crate::level::calculate_level;
use crate::tally;

/// A parsed badge condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadgeCondition {
    /// Current level reaches the threshold.
    Level,
    /// Consecutive-day login streak (ending today or yesterday) reaches the
    /// threshold.
    LoginStreak,
    /// Lifetime gacha plays reach the threshold (a ten-pull counts as ten).
    GachaPlays,
    /// Distinct owned items reach the threshold.
    InventorySize,
    /// Lifetime mission claims reach the threshold.
    MissionClaims,
    /// Profile is complete: non-empty nickname and a saved avatar. The
    /// threshold is ignored.
    ProfileComplete,
    /// Submitted rows on one learning-record sheet reach the threshold,
    /// processed or not.
    RecordCount(SourceKind),
    /// Best primary metric on one learning-record sheet reaches the
    /// threshold.
    MaxMetric(SourceKind),
    /// Lifetime events of one kind reach the threshold.
    EventCount(EventKind),
}

fn source_kind_from_key(key: &str) -> Option<SourceKind> {
    match key {
        "class_reflection" => Some(SourceKind::ClassReflection),
        "test_reflection" => Some(SourceKind::TestReflection),
        "moral_note" => Some(SourceKind::MoralNote),
        "typing" => Some(SourceKind::Typing),
        "arithmetic_drill" => Some(SourceKind::ArithmeticDrill),
        "reading_log" => Some(SourceKind::ReadingLog),
        "self_study" => Some(SourceKind::SelfStudy),
        "growth_log" => Some(SourceKind::GrowthLog),
        _ => None,
    }
}

fn event_kind_from_key(key: &str) -> Option<EventKind> {
    match key {
        "login_bonus" => Some(EventKind::LoginBonus),
        "exp_gain" => Some(EventKind::ExpGain),
        "level_up" => Some(EventKind::LevelUp),
        "item_exchange" => Some(EventKind::ItemExchange),
        "gacha_play" => Some(EventKind::GachaPlay),
        "gacha_duplicate" => Some(EventKind::GachaDuplicate),
        "gacha_ten_pull" => Some(EventKind::GachaTenPull),
        "mission_claim" => Some(EventKind::MissionClaim),
        "badge_award" => Some(EventKind::BadgeAward),
        "point_grant" => Some(EventKind::PointGrant),
        _ => None,
    }
}

impl BadgeCondition {
    /// Parses a raw condition key. Keys are trimmed; empty or unknown keys
    /// yield `None`, and the definition never awards.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        if let Some(kind) = key.strip_prefix("records:") {
            return source_kind_from_key(kind.trim()).map(Self::RecordCount);
        }
        if let Some(kind) = key.strip_prefix("max:") {
            return source_kind_from_key(kind.trim()).map(Self::MaxMetric);
        }
        if let Some(kind) = key.strip_prefix("events:") {
            return event_kind_from_key(kind.trim()).map(Self::EventCount);
        }
        match key {
            "level" => Some(Self::Level),
            "streak" => Some(Self::LoginStreak),
            "gacha_plays" => Some(Self::GachaPlays),
            "inventory" => Some(Self::InventorySize),
            "mission_claims" => Some(Self::MissionClaims),
            "profile" => Some(Self::ProfileComplete),
            _ => None,
        }
    }
}

/// An earned badge joined with its catalog definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EarnedBadgeView {
    /// The catalog definition.
    pub badge: BadgeDefinition,
    /// When the user earned it.
    pub earned_at: NaiveDateTime,
}

/// The result of one badge check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BadgeOutcome {
    /// Everything the user has earned, in award order, including this
    /// check's awards.
    pub earned: Vec<EarnedBadgeView>,
    /// Badges first awarded by this check.
    pub newly_awarded: Vec<BadgeDefinition>,
}

/// Counts consecutive calendar days with a login bonus, walking back from
/// the most recent one. A streak that last fired before yesterday is
/// broken and counts as zero.
fn login_streak(events: &[EventLogEntry], user: &str, now: NaiveDateTime) -> i64 {
    let mut dates: Vec<chrono::NaiveDate> = events
        .iter()
        .filter(|e| e.user == user && matches!(e.detail, EventDetail::LoginBonus { .. }))
        .map(|e| e.at.date())
        .collect();
    dates.sort_unstable();
    dates.dedup();

    let today = now.date();
    let Some(&latest) = dates.last() else {
        return 0;
    };
    if latest != today && latest != today - Duration::days(1) {
        return 0;
    }

    let mut streak = 1;
    let mut cursor = latest;
    for &date in dates.iter().rev().skip(1) {
        if date == cursor - Duration::days(1) {
            streak += 1;
            cursor = date;
        } else {
            break;
        }
    }
    streak
}

fn condition_value(
    store: &dyn GameStore,
    condition: BadgeCondition,
    user_id: &str,
    settings: &Settings,
    events: &[EventLogEntry],
    now: NaiveDateTime,
) -> EngineResult<i64> {
    let mine = || events.iter().filter(|e| e.user == user_id);
    let value = match condition {
        BadgeCondition::Level => {
            let user = store
                .user(user_id)?
                .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
            i64::from(calculate_level(user.cumulative_exp, &settings.level).level)
        }
        BadgeCondition::LoginStreak => login_streak(events, user_id, now),
        BadgeCondition::GachaPlays => tally::gacha_plays(mine()),
        BadgeCondition::InventorySize => {
            i64::try_from(store.inventory(user_id)?.len()).unwrap_or(i64::MAX)
        }
        BadgeCondition::MissionClaims => i64::try_from(
            mine().filter(|e| matches!(e.detail, EventDetail::MissionClaim { .. })).count(),
        )
        .unwrap_or(i64::MAX),
        BadgeCondition::ProfileComplete => {
            let user = store
                .user(user_id)?
                .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
            let complete =
                !user.nickname.trim().is_empty() && !store.avatar(user_id)?.is_empty();
            i64::from(complete)
        }
        BadgeCondition::RecordCount(kind) => i64::try_from(
            store.records(kind)?.iter().filter(|r| r.user == user_id).count(),
        )
        .unwrap_or(i64::MAX),
        BadgeCondition::MaxMetric(kind) => store
            .records(kind)?
            .iter()
            .filter(|r| r.user == user_id)
            .filter_map(|r| r.metrics.primary_metric())
            .max()
            .unwrap_or(0),
        BadgeCondition::EventCount(kind) => {
            i64::try_from(mine().filter(|e| e.detail.kind() == kind).count()).unwrap_or(i64::MAX)
        }
    };
    Ok(value)
}

fn meets(condition: BadgeCondition, value: i64, threshold: i64) -> bool {
    match condition {
        // Completeness is boolean; any configured threshold means "done".
        BadgeCondition::ProfileComplete => value == 1,
        _ => value >= threshold,
    }
}

/// Checks every catalog badge for a user, awarding newly met ones.
///
/// Each new award appends an earned record and a badge event. A badge
/// already in the earned list is never re-evaluated, so awards are
/// exactly-once even if the underlying value later drops below the
/// threshold.
///
/// # Errors
///
/// Store failures and [`EngineError::UserNotFound`] for conditions that
/// need the user row.
pub fn check_and_award_badges(
    store: &mut dyn GameStore,
    user_id: &str,
    settings: &Settings,
    now: NaiveDateTime,
) -> EngineResult<BadgeOutcome> {
    let catalog = store.badges()?;
    let already = store.earned_badges(user_id)?;
    let events = store.events()?;

    let mut outcome = BadgeOutcome::default();
    for earned in &already {
        if let Some(def) = catalog.iter().find(|d| d.id == earned.badge_id) {
            outcome
                .earned
                .push(EarnedBadgeView { badge: def.clone(), earned_at: earned.at });
        }
    }

    for def in catalog {
        if already.iter().any(|e| e.badge_id == def.id) {
            continue;
        }
        let Some(condition) = BadgeCondition::from_key(&def.condition) else {
            continue;
        };

        let value = condition_value(store, condition, user_id, settings, &events, now)?;
        if !meets(condition, value, def.threshold) {
            continue;
        }

        store.add_earned_badge(EarnedBadge {
            user: user_id.to_string(),
            badge_id: def.id.clone(),
            at: now,
        })?;
        store.append_events(vec![EventLogEntry::new(
            now,
            user_id.to_string(),
            EventDetail::BadgeAward { badge_id: def.id.clone(), badge_name: def.name.clone() },
        )])?;
        info!(user = user_id, badge = %def.id, "badge awarded");

        outcome.earned.push(EarnedBadgeView { badge: def.clone(), earned_at: now });
        outcome.newly_awarded.push(def);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_core::{AvatarComposition, SourceMetrics, User};
    use sprout_store::MemoryStore;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 5).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    fn badge(id: &str, condition: &str, threshold: i64) -> BadgeDefinition {
        BadgeDefinition {
            id: id.to_string(),
            condition: condition.to_string(),
            threshold,
            name: format!("Badge {id}"),
            description: String::new(),
        }
    }

    fn login_at(store: &mut MemoryStore, user: &str, at: NaiveDateTime) {
        store
            .append_events(vec![EventLogEntry::new(
                at,
                user.to_string(),
                EventDetail::LoginBonus { amount: 10 },
            )])
            .unwrap();
    }

    #[test]
    fn test_condition_key_parsing() {
        assert_eq!(BadgeCondition::from_key(" level "), Some(BadgeCondition::Level));
        assert_eq!(
            BadgeCondition::from_key("records:reading_log"),
            Some(BadgeCondition::RecordCount(SourceKind::ReadingLog))
        );
        assert_eq!(
            BadgeCondition::from_key("max:typing"),
            Some(BadgeCondition::MaxMetric(SourceKind::Typing))
        );
        assert_eq!(
            BadgeCondition::from_key("events:level_up"),
            Some(BadgeCondition::EventCount(EventKind::LevelUp))
        );
        assert_eq!(BadgeCondition::from_key(""), None);
        assert_eq!(BadgeCondition::from_key("records:nonsense"), None);
    }

    #[test]
    fn test_level_badge_awarded_once() {
        let mut store = MemoryStore::new();
        let mut user = User::new("a@school");
        user.credit_exp(100); // level 2 on the default curve
        store.put_user(user).unwrap();
        store.seed_badge(badge("b-lv2", "level", 2));

        let first = check_and_award_badges(&mut store, "a@school", &Settings::default(), now())
            .unwrap();
        assert_eq!(first.newly_awarded.len(), 1);
        assert_eq!(first.newly_awarded[0].id, "b-lv2");

        // Second check: still earned, never re-awarded.
        let second = check_and_award_badges(&mut store, "a@school", &Settings::default(), now())
            .unwrap();
        assert!(second.newly_awarded.is_empty());
        assert_eq!(second.earned.len(), 1);
        assert_eq!(store.earned_badges("a@school").unwrap().len(), 1);
    }

    #[test]
    fn test_streak_counts_consecutive_days_only() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        // Logins today, yesterday, and the day before; then a gap.
        for days_back in 0..3 {
            login_at(&mut store, "a@school", now() - Duration::days(days_back));
        }
        login_at(&mut store, "a@school", now() - Duration::days(5));

        let events = store.events().unwrap();
        assert_eq!(login_streak(&events, "a@school", now()), 3);
    }

    #[test]
    fn test_stale_streak_is_zero() {
        let mut store = MemoryStore::new();
        login_at(&mut store, "a@school", now() - Duration::days(3));
        login_at(&mut store, "a@school", now() - Duration::days(2));

        let events = store.events().unwrap();
        assert_eq!(login_streak(&events, "a@school", now()), 0);
    }

    #[test]
    fn test_streak_ending_yesterday_still_counts() {
        let mut store = MemoryStore::new();
        login_at(&mut store, "a@school", now() - Duration::days(1));
        login_at(&mut store, "a@school", now() - Duration::days(2));

        let events = store.events().unwrap();
        assert_eq!(login_streak(&events, "a@school", now()), 2);
    }

    #[test]
    fn test_record_count_and_max_metric() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        store.submit_record("a@school", SourceMetrics::ReadingLog { pages: 5 });
        store.submit_record("a@school", SourceMetrics::ReadingLog { pages: 30 });
        store.submit_record("b@school", SourceMetrics::ReadingLog { pages: 99 });
        store.seed_badge(badge("b-reader", "records:reading_log", 2));
        store.seed_badge(badge("b-marathon", "max:reading_log", 25));
        store.seed_badge(badge("b-unreached", "max:reading_log", 50));

        let outcome = check_and_award_badges(&mut store, "a@school", &Settings::default(), now())
            .unwrap();
        let ids: Vec<&str> = outcome.newly_awarded.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b-reader", "b-marathon"]);
    }

    #[test]
    fn test_profile_badge_requires_nickname_and_avatar() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        store.seed_badge(badge("b-profile", "profile", 1));

        // Nickname alone is not enough.
        let outcome = check_and_award_badges(&mut store, "a@school", &Settings::default(), now())
            .unwrap();
        assert!(outcome.newly_awarded.is_empty());

        let mut composition = AvatarComposition::new();
        composition.insert("hat".to_string(), "n-1".to_string());
        store.save_avatar("a@school", composition).unwrap();

        let outcome = check_and_award_badges(&mut store, "a@school", &Settings::default(), now())
            .unwrap();
        assert_eq!(outcome.newly_awarded.len(), 1);
    }

    #[test]
    fn test_unparseable_condition_never_awards() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        store.seed_badge(badge("b-typo", "levle", 1));

        let outcome = check_and_award_badges(&mut store, "a@school", &Settings::default(), now())
            .unwrap();
        assert!(outcome.newly_awarded.is_empty());
    }

    #[test]
    fn test_award_logs_event() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        store.seed_badge(badge("b-lv1", "level", 1));

        check_and_award_badges(&mut store, "a@school", &Settings::default(), now()).unwrap();
        let events = store.events().unwrap();
        assert!(events.iter().any(|e| matches!(
            &e.detail,
            EventDetail::BadgeAward { badge_id, .. } if badge_id == "b-lv1"
        )));
    }
}
