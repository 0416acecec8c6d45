//! In-memory `GameStore` implementation.
//!
//! Insertion-order-preserving, classroom-scale. Backs every test in the
//! workspace and doubles as the store for single-process deployments where
//! the sheet contents are loaded at startup and flushed externally.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;

use sprout_core::{
    Announcement, AvatarComposition, BadgeDefinition, EarnedBadge, EventLogEntry, Item, ItemId,
    MissionDefinition, Settings, SourceKind, SourceMetrics, SourceRecord, User, UserId,
};

use crate::error::{StoreError, StoreResult};
use crate::GameStore;

/// A learning-record row plus its processed flag.
#[derive(Clone, Debug)]
struct RecordRow {
    record: SourceRecord,
    processed: bool,
}

/// In-memory tabular store.
#[derive(Default)]
pub struct MemoryStore {
    users: Vec<User>,
    records: HashMap<SourceKind, Vec<RecordRow>>,
    next_record_row: u64,
    events: Vec<EventLogEntry>,
    next_seq: u64,
    items: Vec<Item>,
    missions: Vec<MissionDefinition>,
    badges: Vec<BadgeDefinition>,
    inventories: HashMap<UserId, BTreeSet<ItemId>>,
    avatars: HashMap<UserId, AvatarComposition>,
    earned: Vec<EarnedBadge>,
    announcements: Vec<Announcement>,
    next_announcement_row: u64,
    settings: Settings,
}

impl MemoryStore {
    /// Creates an empty store with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a catalog item.
    pub fn seed_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Seeds a mission definition.
    pub fn seed_mission(&mut self, mission: MissionDefinition) {
        self.missions.push(mission);
    }

    /// Seeds a badge definition.
    pub fn seed_badge(&mut self, badge: BadgeDefinition) {
        self.badges.push(badge);
    }

    /// Appends an unprocessed learning record, as a form submission would,
    /// and returns its row reference.
    pub fn submit_record(&mut self, user: impl Into<UserId>, metrics: SourceMetrics) -> u64 {
        let row = self.next_record_row;
        self.next_record_row += 1;
        let kind = metrics.kind();
        self.records.entry(kind).or_default().push(RecordRow {
            record: SourceRecord { row, user: user.into(), metrics },
            processed: false,
        });
        row
    }

    /// True when the given row of the given sheet carries the processed
    /// flag. Test helper.
    #[must_use]
    pub fn is_processed(&self, kind: SourceKind, row: u64) -> bool {
        self.records
            .get(&kind)
            .into_iter()
            .flatten()
            .any(|r| r.record.row == row && r.processed)
    }

    fn flag_position(&self, kind: SourceKind, row: u64) -> StoreResult<usize> {
        self.records
            .get(&kind)
            .into_iter()
            .flatten()
            .position(|r| r.record.row == row)
            .ok_or_else(|| StoreError::RowNotFound { sheet: kind.label().to_string(), row })
    }
}

impl GameStore for MemoryStore {
    fn user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    fn put_user(&mut self, user: User) -> StoreResult<()> {
        match self.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
        Ok(())
    }

    fn users(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.clone())
    }

    fn records(&self, kind: SourceKind) -> StoreResult<Vec<SourceRecord>> {
        Ok(self
            .records
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|r| r.record.clone())
            .collect())
    }

    fn unprocessed_records(&self, kind: SourceKind) -> StoreResult<Vec<SourceRecord>> {
        Ok(self
            .records
            .get(&kind)
            .into_iter()
            .flatten()
            .filter(|r| !r.processed)
            .map(|r| r.record.clone())
            .collect())
    }

    fn commit_ingest(
        &mut self,
        flags: &[(SourceKind, u64)],
        users: Vec<User>,
        events: Vec<EventLogEntry>,
    ) -> StoreResult<()> {
        // Validate every flag target before touching anything, so a missing
        // row leaves no partial state.
        let mut positions = Vec::with_capacity(flags.len());
        for &(kind, row) in flags {
            positions.push((kind, self.flag_position(kind, row)?));
        }
        for (kind, pos) in positions {
            if let Some(rows) = self.records.get_mut(&kind) {
                rows[pos].processed = true;
            }
        }
        for user in users {
            self.put_user(user)?;
        }
        self.append_events(events)
    }

    fn append_events(&mut self, events: Vec<EventLogEntry>) -> StoreResult<()> {
        for mut entry in events {
            entry.seq = self.next_seq;
            self.next_seq += 1;
            self.events.push(entry);
        }
        Ok(())
    }

    fn events(&self) -> StoreResult<Vec<EventLogEntry>> {
        Ok(self.events.clone())
    }

    fn items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.items.clone())
    }

    fn missions(&self) -> StoreResult<Vec<MissionDefinition>> {
        Ok(self.missions.clone())
    }

    fn badges(&self) -> StoreResult<Vec<BadgeDefinition>> {
        Ok(self.badges.clone())
    }

    fn inventory(&self, user: &str) -> StoreResult<BTreeSet<ItemId>> {
        Ok(self.inventories.get(user).cloned().unwrap_or_default())
    }

    fn add_inventory(&mut self, user: &str, items: &[ItemId]) -> StoreResult<()> {
        let set = self.inventories.entry(user.to_string()).or_default();
        for item in items {
            set.insert(item.clone());
        }
        Ok(())
    }

    fn avatar(&self, user: &str) -> StoreResult<AvatarComposition> {
        Ok(self.avatars.get(user).cloned().unwrap_or_default())
    }

    fn save_avatar(&mut self, user: &str, composition: AvatarComposition) -> StoreResult<()> {
        self.avatars.insert(user.to_string(), composition);
        Ok(())
    }

    fn earned_badges(&self, user: &str) -> StoreResult<Vec<EarnedBadge>> {
        Ok(self.earned.iter().filter(|e| e.user == user).cloned().collect())
    }

    fn add_earned_badge(&mut self, earned: EarnedBadge) -> StoreResult<()> {
        self.earned.push(earned);
        Ok(())
    }

    fn announcements(&self) -> StoreResult<Vec<Announcement>> {
        Ok(self.announcements.clone())
    }

    fn post_announcement(
        &mut self,
        title: &str,
        body: &str,
        at: NaiveDateTime,
    ) -> StoreResult<Announcement> {
        let announcement = Announcement {
            row: self.next_announcement_row,
            title: title.to_string(),
            body: body.to_string(),
            at,
        };
        self.next_announcement_row += 1;
        self.announcements.push(announcement.clone());
        Ok(announcement)
    }

    fn delete_announcement(&mut self, row: u64) -> StoreResult<()> {
        let pos = self
            .announcements
            .iter()
            .position(|a| a.row == row)
            .ok_or_else(|| StoreError::RowNotFound { sheet: "announcements".to_string(), row })?;
        self.announcements.remove(pos);
        Ok(())
    }

    fn settings(&self) -> StoreResult<Settings> {
        Ok(self.settings.clone())
    }

    fn save_settings(&mut self, settings: &Settings) -> StoreResult<()> {
        self.settings = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_and_filter_unprocessed() {
        let mut store = MemoryStore::new();
        let row = store.submit_record("a@school", SourceMetrics::MoralNote);
        store.submit_record("b@school", SourceMetrics::MoralNote);

        store.commit_ingest(&[(SourceKind::MoralNote, row)], vec![], vec![]).unwrap();

        let unprocessed = store.unprocessed_records(SourceKind::MoralNote).unwrap();
        assert_eq!(unprocessed.len(), 1);
        assert_eq!(unprocessed[0].user, "b@school");
        assert!(store.is_processed(SourceKind::MoralNote, row));
        // Full history still visible for badge aggregation
        assert_eq!(store.records(SourceKind::MoralNote).unwrap().len(), 2);
    }

    #[test]
    fn test_commit_ingest_is_all_or_nothing() {
        let mut store = MemoryStore::new();
        let row = store.submit_record("a@school", SourceMetrics::SelfStudy);

        let err = store
            .commit_ingest(
                &[(SourceKind::SelfStudy, row), (SourceKind::SelfStudy, 999)],
                vec![User::new("a@school")],
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::RowNotFound { .. }));

        // The valid row must not have been flagged by the failed commit.
        assert!(!store.is_processed(SourceKind::SelfStudy, row));
        assert!(store.user("a@school").unwrap().is_none());
    }

    #[test]
    fn test_event_append_assigns_total_order() {
        let mut store = MemoryStore::new();
        let at = chrono::NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        store
            .append_events(vec![
                EventLogEntry::new(at, "a@school".to_string(), sprout_core::EventDetail::ProfileSave),
                EventLogEntry::new(at, "a@school".to_string(), sprout_core::EventDetail::AvatarSave),
            ])
            .unwrap();
        let events = store.events().unwrap();
        assert_eq!(events[0].seq, 0);
        assert_eq!(events[1].seq, 1);
    }

    #[test]
    fn test_inventory_set_semantics() {
        let mut store = MemoryStore::new();
        store.add_inventory("a@school", &["hat_01".to_string(), "hat_01".to_string()]).unwrap();
        store.add_inventory("a@school", &["hat_01".to_string()]).unwrap();
        assert_eq!(store.inventory("a@school").unwrap().len(), 1);
    }
}
