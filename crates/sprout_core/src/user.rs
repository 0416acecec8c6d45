//! User profiles and currency balances.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Unique external identifier for a user (email-equivalent, verified by the
/// identity provider before it ever reaches an engine).
pub type UserId = String;

/// Role of a user within a classroom.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular learner. The default for accounts created on first login.
    #[default]
    Student,
    /// Classroom teacher. Gates the administrative API surface.
    Teacher,
}

/// A user profile with its three currency pools.
///
/// Created on first login, mutated by ingestion, login bonus, gacha, mission
/// claims, and teacher grants. Never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique external identifier.
    pub id: UserId,
    /// Display nickname. Defaults to the identifier's local part.
    pub nickname: String,
    /// Role (student or teacher).
    pub role: Role,
    /// Lifetime experience total. Monotonically non-decreasing, never reset.
    /// Drives level computation only.
    pub cumulative_exp: i64,
    /// Spendable experience balance. Increases on gains, decreases on gacha
    /// spend. Not bounded by `cumulative_exp` - they track different pools.
    pub spendable_exp: i64,
    /// Exchange points earned from duplicates and mission rewards.
    pub exchange_points: i64,
    /// Date of the most recent login bonus, at date-only granularity.
    pub last_login: Option<NaiveDate>,
}

impl User {
    /// Creates a fresh profile for a first login.
    ///
    /// The nickname defaults to the part of the identifier before `@`, or
    /// the whole identifier when there is none.
    #[must_use]
    pub fn new(id: impl Into<UserId>) -> Self {
        let id = id.into();
        let nickname = id.split('@').next().unwrap_or(&id).to_string();
        Self {
            id,
            nickname,
            role: Role::Student,
            cumulative_exp: 0,
            spendable_exp: 0,
            exchange_points: 0,
            last_login: None,
        }
    }

    /// Credits experience to both the cumulative total and the spendable
    /// balance. This is the single path by which experience enters the
    /// system: ingestion, login bonus, mission rewards, and teacher grants
    /// all go through here.
    pub fn credit_exp(&mut self, amount: i64) {
        self.cumulative_exp += amount;
        self.spendable_exp += amount;
    }

    /// Returns true for teacher accounts.
    #[must_use]
    pub const fn is_teacher(&self) -> bool {
        matches!(self.role, Role::Teacher)
    }
}
