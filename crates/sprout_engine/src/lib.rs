//! # SPROUT Engines
//!
//! The algorithmic core of the gamified learning backend: level math, batch
//! ingestion of learning records, mission and badge condition evaluation,
//! and the gacha economy.
//!
//! ## Design Principles
//!
//! 1. **Explicit dependencies** - every engine takes the store and the
//!    settings as separate parameters; nothing rides in ambient state
//! 2. **Idempotent ingestion** - the processed flag is the single
//!    deduplication mechanism, and flag flips commit together with the
//!    balances they justify
//! 3. **Structured events** - conditions read typed event fields, never
//!    re-parsed display strings
//! 4. **Caller-supplied time** - `now` is a parameter, so windows and
//!    streaks are testable without a clock

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod badge;
pub mod error;
pub mod gacha;
pub mod ingest;
pub mod level;
pub mod login;
pub mod mission;
mod tally;

pub use badge::{check_and_award_badges, BadgeCondition, BadgeOutcome, EarnedBadgeView};
pub use error::{EngineError, EngineResult};
pub use gacha::{
    draw_item, exchange_item, play_gacha, play_gacha_ten, DrawOutcome, GachaPlayResult,
};
pub use ingest::{exp_delta, run_batch, BatchReport};
pub use level::{calculate_level, LevelStanding, MAX_LEVEL};
pub use login::apply_login_bonus;
pub use mission::{
    check_missions, claim_mission_reward, mission_window, MissionCondition, MissionStatus,
};
