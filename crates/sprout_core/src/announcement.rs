//! Teacher-posted announcements.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A notice posted by a teacher, shown in the bootstrap payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Row reference, used for deletion.
    pub row: u64,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// When it was posted.
    pub at: NaiveDateTime,
}
