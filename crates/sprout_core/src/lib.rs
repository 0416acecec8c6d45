//! # SPROUT Core Types
//!
//! Shared domain types for the SPROUT gamified learning backend.
//!
//! ## Design Principles
//!
//! 1. **Structured events** - The event log carries typed fields, never
//!    display strings that downstream code would have to re-parse
//! 2. **Immutable catalogs** - Catalog entries are cloned into result
//!    wrappers; engines never hand out mutable references to shared data
//! 3. **External configuration** - Every tunable number lives in [`Settings`]
//!
//! ## Currency Model
//!
//! Three pools, deliberately distinct:
//!
//! - **Cumulative experience**: lifetime total, never decreases, drives level
//! - **Spendable experience**: balance, increases on gains, decreases on
//!   gacha spend
//! - **Exchange points**: secondary currency from duplicates and missions,
//!   spent on direct item purchases

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod announcement;
pub mod badge;
pub mod event;
pub mod item;
pub mod mission;
pub mod record;
pub mod settings;
pub mod user;

pub use announcement::Announcement;
pub use badge::{BadgeDefinition, BadgeId, EarnedBadge};
pub use event::{EventDetail, EventKind, EventLogEntry};
pub use item::{AvatarComposition, Item, ItemId, Rarity};
pub use mission::{Cadence, MissionDefinition, MissionId, RewardKind};
pub use record::{SourceKind, SourceMetrics, SourceRecord};
pub use settings::{DuplicatePoints, GachaWeights, LevelCurve, Settings, SettingsError};
pub use user::{Role, User, UserId};
