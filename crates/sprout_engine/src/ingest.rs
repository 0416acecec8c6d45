//! # Batch Ingestion Engine
//!
//! Scheduled, single-threaded pass that converts unprocessed learning
//! records into experience. For each source kind, in the fixed declared
//! order: read unprocessed rows, compute the kind's formula per row, stage
//! a processed-flag flip for every touched row (zero-delta rows included -
//! they must not be retried), and stage an experience-gain event per
//! credited row. A kind whose read fails is logged and skipped; the
//! remaining kinds still run.
//!
//! After all kinds, one commit applies flag flips, changed users, and
//! staged events together through [`GameStore::commit_ingest`]. Level-up
//! events come from comparing each changed user's standing before and after
//! the batch, which decouples "experience was credited" from "level
//! changed".
//!
//! A crash between staging and commit loses the whole batch (rows stay
//! unprocessed and are retried next run); the commit itself is
//! all-or-nothing, so no row is ever half-applied.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use sprout_core::{EventDetail, EventLogEntry, Settings, SourceKind, SourceMetrics, UserId};
use sprout_store::GameStore;

use crate::error::EngineResult;
use crate::level::calculate_level;

/// Outcome summary of one batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    /// Rows flagged processed this run (credited or not).
    pub rows_processed: usize,
    /// Rows that produced a non-zero experience delta.
    pub rows_credited: usize,
    /// Users whose cumulative total changed and were written back.
    pub users_updated: usize,
    /// Level-up events emitted at commit.
    pub level_ups: usize,
    /// Source kinds whose pass failed and was skipped, with the reason.
    pub skipped_kinds: Vec<(SourceKind, String)>,
    /// Per-row problems collected during the commit pass (e.g. records
    /// owned by an unknown user). Reported in aggregate, never fail-fast.
    pub row_errors: Vec<String>,
}

/// Computes the experience delta for one learning record.
///
/// Formulas per kind, all floors, never negative:
///
/// | Kind | Formula |
/// |---|---|
/// | Class reflection | flat `reflection_exp` |
/// | Test reflection | `floor(coef * s1^2) + floor(coef * s2^2)` |
/// | Moral note | flat `moral_note_exp` |
/// | Typing | `floor(speed * (accuracy / 100) * coef)` |
/// | Arithmetic drill | `max(0, score - seconds / divisor)` |
/// | Reading log | `floor(pages * coef)` |
/// | Self-study | flat `self_study_exp` |
/// | Growth log | flat `growth_log_exp` |
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn exp_delta(metrics: &SourceMetrics, settings: &Settings) -> i64 {
    match metrics {
        SourceMetrics::ClassReflection => settings.reflection_exp,
        SourceMetrics::TestReflection { score1, score2 } => {
            let per_score = |score: u32| {
                ((settings.test_score_coef * f64::from(score) * f64::from(score)).floor() as i64)
                    .max(0)
            };
            per_score(*score1) + per_score(*score2)
        }
        SourceMetrics::MoralNote => settings.moral_note_exp,
        SourceMetrics::Typing { speed, accuracy } => {
            ((speed * (accuracy / 100.0) * settings.typing_coef).floor() as i64).max(0)
        }
        SourceMetrics::ArithmeticDrill { score, seconds } => {
            let penalty = if settings.drill_time_divisor == 0 {
                0
            } else {
                seconds / settings.drill_time_divisor
            };
            (i64::from(*score) - i64::from(penalty)).max(0)
        }
        SourceMetrics::ReadingLog { pages } => {
            ((f64::from(*pages) * settings.reading_page_coef).floor() as i64).max(0)
        }
        SourceMetrics::SelfStudy => settings.self_study_exp,
        SourceMetrics::GrowthLog => settings.growth_log_exp,
    }
}

/// Runs one scheduled ingestion batch.
///
/// Idempotent over the processed flag: a second run on the same snapshot
/// finds every row already flagged and credits nothing.
///
/// # Errors
///
/// Returns an error only when the final commit fails; per-kind read
/// failures and per-row problems are collected into the report instead.
pub fn run_batch(
    store: &mut dyn GameStore,
    settings: &Settings,
    now: NaiveDateTime,
) -> EngineResult<BatchReport> {
    let mut report = BatchReport::default();
    let mut flags: Vec<(SourceKind, u64)> = Vec::new();
    let mut credits: BTreeMap<UserId, i64> = BTreeMap::new();
    let mut events: Vec<EventLogEntry> = Vec::new();

    for kind in SourceKind::ALL {
        let rows = match store.unprocessed_records(kind) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(kind = kind.label(), error = %e, "source pass failed, skipping kind");
                report.skipped_kinds.push((kind, e.to_string()));
                continue;
            }
        };

        for record in rows {
            // Touched rows are flagged whether or not they credit anything.
            flags.push((kind, record.row));
            report.rows_processed += 1;

            let delta = exp_delta(&record.metrics, settings);
            if delta != 0 {
                *credits.entry(record.user.clone()).or_insert(0) += delta;
                events.push(EventLogEntry::new(
                    now,
                    record.user.clone(),
                    EventDetail::ExpGain { amount: delta, source: kind },
                ));
                report.rows_credited += 1;
            }

            // Completion markers for mission counting, credited or not.
            match kind {
                SourceKind::Typing => {
                    events.push(EventLogEntry::new(now, record.user, EventDetail::TypingCompleted));
                }
                SourceKind::ArithmeticDrill => {
                    events.push(EventLogEntry::new(now, record.user, EventDetail::DrillCompleted));
                }
                _ => {}
            }
        }
    }

    // Commit pass: write back only users whose total actually changed, and
    // detect level crossings against the pre-batch snapshot.
    let mut changed = Vec::with_capacity(credits.len());
    for (user_id, delta) in credits {
        let user = match store.user(&user_id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                report.row_errors.push(format!("records for unknown user {user_id}"));
                continue;
            }
            Err(e) => {
                report.row_errors.push(format!("lookup failed for {user_id}: {e}"));
                continue;
            }
        };

        let before = calculate_level(user.cumulative_exp, &settings.level);
        let mut user = user;
        user.credit_exp(delta);
        let after = calculate_level(user.cumulative_exp, &settings.level);

        if after.level > before.level {
            events.push(EventLogEntry::new(
                now,
                user.id.clone(),
                EventDetail::LevelUp { new_level: after.level },
            ));
            report.level_ups += 1;
        }
        changed.push(user);
    }

    report.users_updated = changed.len();
    store.commit_ingest(&flags, changed, events)?;

    info!(
        rows = report.rows_processed,
        credited = report.rows_credited,
        users = report.users_updated,
        level_ups = report.level_ups,
        "ingestion batch committed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_core::User;
    use sprout_store::MemoryStore;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_hms_opt(6, 0, 0).unwrap()
    }

    fn store_with_user(id: &str) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.put_user(User::new(id)).unwrap();
        store
    }

    #[test]
    fn test_formulas() {
        let s = Settings::default();
        assert_eq!(exp_delta(&SourceMetrics::ClassReflection, &s), 20);
        // 0.1 * 80^2 = 640, 0.1 * 0^2 = 0
        assert_eq!(
            exp_delta(&SourceMetrics::TestReflection { score1: 80, score2: 0 }, &s),
            640
        );
        // 120 cpm * 0.95 * 0.5 = 57
        assert_eq!(
            exp_delta(&SourceMetrics::Typing { speed: 120.0, accuracy: 95.0 }, &s),
            57
        );
        // 30 - floor(400 / 10) < 0 clamps to zero
        assert_eq!(
            exp_delta(&SourceMetrics::ArithmeticDrill { score: 30, seconds: 400 }, &s),
            0
        );
        assert_eq!(exp_delta(&SourceMetrics::ReadingLog { pages: 12 }, &s), 24);
    }

    #[test]
    fn test_negative_coefficients_never_debit() {
        let mut s = Settings::default();
        s.test_score_coef = -1.0;
        s.reading_page_coef = -2.0;
        assert_eq!(
            exp_delta(&SourceMetrics::TestReflection { score1: 80, score2: 90 }, &s),
            0
        );
        assert_eq!(exp_delta(&SourceMetrics::ReadingLog { pages: 12 }, &s), 0);
    }

    #[test]
    fn test_batch_credits_and_flags() {
        let mut store = store_with_user("a@school");
        store.submit_record("a@school", SourceMetrics::MoralNote);
        let drill = store.submit_record(
            "a@school",
            SourceMetrics::ArithmeticDrill { score: 5, seconds: 600 },
        );

        let report = run_batch(&mut store, &Settings::default(), now()).unwrap();

        assert_eq!(report.rows_processed, 2);
        // The drill row computed zero but is still flagged.
        assert_eq!(report.rows_credited, 1);
        assert!(store.is_processed(SourceKind::ArithmeticDrill, drill));

        let user = store.user("a@school").unwrap().unwrap();
        assert_eq!(user.cumulative_exp, 15);
        assert_eq!(user.spendable_exp, 15);

        // Drill rows emit a completion marker even when uncredited.
        let events = store.events().unwrap();
        assert!(events.iter().any(|e| e.detail == EventDetail::DrillCompleted));
    }

    #[test]
    fn test_second_run_credits_nothing() {
        let mut store = store_with_user("a@school");
        store.submit_record("a@school", SourceMetrics::SelfStudy);

        let first = run_batch(&mut store, &Settings::default(), now()).unwrap();
        assert_eq!(first.rows_credited, 1);

        let second = run_batch(&mut store, &Settings::default(), now()).unwrap();
        assert_eq!(second.rows_processed, 0);
        assert_eq!(second.rows_credited, 0);

        let user = store.user("a@school").unwrap().unwrap();
        assert_eq!(user.cumulative_exp, 20);
    }

    #[test]
    fn test_level_up_event_on_threshold_cross() {
        let mut store = store_with_user("a@school");
        // Default curve: level 1 clears at 100. Five reflections = 100.
        for _ in 0..5 {
            store.submit_record("a@school", SourceMetrics::ClassReflection);
        }

        let report = run_batch(&mut store, &Settings::default(), now()).unwrap();
        assert_eq!(report.level_ups, 1);

        let events = store.events().unwrap();
        let level_up = events
            .iter()
            .find(|e| matches!(e.detail, EventDetail::LevelUp { .. }))
            .expect("level-up event");
        assert_eq!(level_up.detail, EventDetail::LevelUp { new_level: 2 });
    }

    #[test]
    fn test_small_gains_below_threshold_emit_no_level_up() {
        let mut store = store_with_user("a@school");
        store.submit_record("a@school", SourceMetrics::MoralNote);

        let report = run_batch(&mut store, &Settings::default(), now()).unwrap();
        assert_eq!(report.level_ups, 0);
    }

    #[test]
    fn test_unknown_user_collected_not_fatal() {
        let mut store = store_with_user("a@school");
        store.submit_record("a@school", SourceMetrics::MoralNote);
        store.submit_record("ghost@school", SourceMetrics::MoralNote);

        let report = run_batch(&mut store, &Settings::default(), now()).unwrap();
        assert_eq!(report.users_updated, 1);
        assert_eq!(report.row_errors.len(), 1);

        // The known user still got credited.
        let user = store.user("a@school").unwrap().unwrap();
        assert_eq!(user.cumulative_exp, 15);
    }
}
