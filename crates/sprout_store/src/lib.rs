//! # SPROUT Store Adapter
//!
//! The persistence seam between the engines and whatever actually holds the
//! rows. Engines receive `&dyn GameStore` (or `&mut`) plus a [`Settings`]
//! value as separate, explicit parameters - the store never travels inside
//! configuration.
//!
//! ## Guarantees required of implementations
//!
//! - Collections preserve insertion order; the event log's append order is
//!   its total order (ties in wall-clock time break by sequence)
//! - [`GameStore::commit_ingest`] applies processed flags, user balances,
//!   and log appends together, all-or-nothing
//! - Reads return the current persisted state at call time; there is no
//!   cross-operation caching
//!
//! No isolation across concurrent operations is promised here; callers
//! serialize per-user mutations themselves.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use sprout_core::{
    Announcement, AvatarComposition, BadgeDefinition, EarnedBadge, EventLogEntry, Item, ItemId,
    MissionDefinition, Settings, SourceKind, SourceRecord, User,
};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Tabular persistence as the engines see it.
///
/// One method per access pattern the core needs; everything else about the
/// underlying sheets (column layout, row lookup) stays behind this trait.
pub trait GameStore: Send {
    /// Looks up a user by identifier. `Ok(None)` means no such user yet.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the user collection is unreadable.
    fn user(&self, id: &str) -> StoreResult<Option<User>>;

    /// Inserts or overwrites a user row (last write wins).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn put_user(&mut self, user: User) -> StoreResult<()>;

    /// All users, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the user collection is unreadable.
    fn users(&self) -> StoreResult<Vec<User>>;

    /// All rows of a learning-record sheet, processed or not. Used by badge
    /// conditions that aggregate over record history.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the sheet is unreadable.
    fn records(&self, kind: SourceKind) -> StoreResult<Vec<SourceRecord>>;

    /// Rows of a learning-record sheet not yet flagged processed.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the sheet is unreadable.
    fn unprocessed_records(&self, kind: SourceKind) -> StoreResult<Vec<SourceRecord>>;

    /// Applies one batch-ingestion commit: flips the processed flag on every
    /// referenced row, writes back the changed users, and appends the staged
    /// events. All-or-nothing: a failure leaves no partial state.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when any referenced row is missing; nothing
    /// is applied in that case.
    fn commit_ingest(
        &mut self,
        flags: &[(SourceKind, u64)],
        users: Vec<User>,
        events: Vec<EventLogEntry>,
    ) -> StoreResult<()>;

    /// Appends entries to the event log, assigning sequence numbers.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the append fails.
    fn append_events(&mut self, events: Vec<EventLogEntry>) -> StoreResult<()>;

    /// The full event log in append order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the log is unreadable.
    fn events(&self) -> StoreResult<Vec<EventLogEntry>>;

    /// The static item catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the catalog is unreadable.
    fn items(&self) -> StoreResult<Vec<Item>>;

    /// The static mission catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the catalog is unreadable.
    fn missions(&self) -> StoreResult<Vec<MissionDefinition>>;

    /// The static badge catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the catalog is unreadable.
    fn badges(&self) -> StoreResult<Vec<BadgeDefinition>>;

    /// The set of item ids a user owns. Set semantics: no duplicates.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the inventory collection is unreadable.
    fn inventory(&self, user: &str) -> StoreResult<BTreeSet<ItemId>>;

    /// Adds items to a user's inventory. Already-owned ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn add_inventory(&mut self, user: &str, items: &[ItemId]) -> StoreResult<()>;

    /// The user's avatar composition. Empty when never saved.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the avatar collection is unreadable.
    fn avatar(&self, user: &str) -> StoreResult<AvatarComposition>;

    /// Overwrites the user's avatar composition (last write wins).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn save_avatar(&mut self, user: &str, composition: AvatarComposition) -> StoreResult<()>;

    /// Badges the user has earned, in award order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the collection is unreadable.
    fn earned_badges(&self, user: &str) -> StoreResult<Vec<EarnedBadge>>;

    /// Appends one earned-badge record. Callers enforce at-most-once per
    /// (user, badge); the store does not.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn add_earned_badge(&mut self, earned: EarnedBadge) -> StoreResult<()>;

    /// All announcements, newest last.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the collection is unreadable.
    fn announcements(&self) -> StoreResult<Vec<Announcement>>;

    /// Appends an announcement and returns it with its assigned row
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn post_announcement(
        &mut self,
        title: &str,
        body: &str,
        at: NaiveDateTime,
    ) -> StoreResult<Announcement>;

    /// Deletes an announcement by row reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowNotFound`] when no such row exists.
    fn delete_announcement(&mut self, row: u64) -> StoreResult<()>;

    /// The current settings. Called at the start of every operation.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the settings sheet is unreadable.
    fn settings(&self) -> StoreResult<Settings>;

    /// Overwrites the settings.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn save_settings(&mut self, settings: &Settings) -> StoreResult<()>;
}
