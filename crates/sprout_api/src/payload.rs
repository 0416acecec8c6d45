//! Payload types the API surface returns.
//!
//! These are projections: the UI gets exactly what it renders, never raw
//! store rows. Everything here serializes.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use sprout_core::{
    Announcement, AvatarComposition, Item, ItemId, RewardKind, Role, Settings, UserId,
};
use sprout_engine::{GachaPlayResult, MissionStatus};

/// A user profile with its computed level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    /// Unique identifier.
    pub id: UserId,
    /// Display nickname.
    pub nickname: String,
    /// Role.
    pub role: Role,
    /// Current level.
    pub level: u32,
    /// Percent progress into the current level.
    pub progress_percent: u8,
    /// Lifetime experience total.
    pub cumulative_exp: i64,
    /// Spendable experience balance.
    pub spendable_exp: i64,
    /// Exchange-point balance.
    pub exchange_points: i64,
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    /// Display nickname.
    pub nickname: String,
    /// Current level.
    pub level: u32,
    /// Lifetime experience total.
    pub cumulative_exp: i64,
}

/// One rendered activity-feed line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    /// When it happened.
    pub at: NaiveDateTime,
    /// Rendered display string.
    pub message: String,
}

/// A badge the user has earned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BadgeView {
    /// Badge identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// When the user earned it.
    pub earned_at: NaiveDateTime,
}

/// The aggregated bootstrap payload for the student UI.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameData {
    /// The caller's profile.
    pub profile: ProfileView,
    /// Owned item ids.
    pub inventory: Vec<ItemId>,
    /// Current avatar composition.
    pub avatar: AvatarComposition,
    /// The full item catalog.
    pub catalog: Vec<Item>,
    /// Mission states for the caller.
    pub missions: Vec<MissionStatus>,
    /// Badges the caller has earned.
    pub badges: Vec<BadgeView>,
    /// Leaderboard by cumulative experience, students only.
    pub rankings: Vec<RankingEntry>,
    /// Newest activity lines for the caller, newest first.
    pub recent_activity: Vec<ActivityEntry>,
    /// Current announcements.
    pub announcements: Vec<Announcement>,
    /// Amount credited by this request's login bonus, when it fired.
    pub login_bonus: Option<i64>,
}

/// One draw in a gacha result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DrawView {
    /// The drawn item.
    pub item: Item,
    /// Whether it converted to points instead of entering the inventory.
    pub duplicate: bool,
    /// Points credited for a duplicate.
    pub points: i64,
}

/// The payload of a gacha play.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GachaView {
    /// One entry per draw.
    pub outcomes: Vec<DrawView>,
    /// Spendable balance after the play.
    pub spendable_exp: i64,
    /// Exchange points after the play.
    pub exchange_points: i64,
}

impl From<GachaPlayResult> for GachaView {
    fn from(result: GachaPlayResult) -> Self {
        Self {
            outcomes: result
                .outcomes
                .into_iter()
                .map(|o| DrawView { item: o.item, duplicate: o.duplicate, points: o.points })
                .collect(),
            spendable_exp: result.spendable_exp,
            exchange_points: result.exchange_points,
        }
    }
}

/// One row of the teacher's class overview.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    /// Unique identifier.
    pub id: UserId,
    /// Display nickname.
    pub nickname: String,
    /// Current level.
    pub level: u32,
    /// Lifetime experience total.
    pub cumulative_exp: i64,
    /// Spendable experience balance.
    pub spendable_exp: i64,
    /// Exchange-point balance.
    pub exchange_points: i64,
    /// Most recent login-bonus date.
    pub last_login: Option<NaiveDate>,
    /// Number of badges earned.
    pub badges_earned: usize,
}

/// The teacher dashboard payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TeacherData {
    /// All students, in store order.
    pub students: Vec<StudentSummary>,
    /// Current announcements.
    pub announcements: Vec<Announcement>,
    /// Current tunable settings.
    pub settings: Settings,
}

/// Drill-down for one student.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentDetails {
    /// The student's profile.
    pub profile: ProfileView,
    /// Badges the student has earned.
    pub badges: Vec<BadgeView>,
    /// Newest activity lines, newest first.
    pub recent_activity: Vec<ActivityEntry>,
    /// Number of distinct owned items.
    pub inventory_size: usize,
}

/// A teacher's bulk grant request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    /// Recipients.
    pub user_ids: Vec<UserId>,
    /// What to credit.
    pub kind: RewardKind,
    /// How much to credit each recipient.
    pub amount: i64,
    /// Free-text reason, recorded in each grant event.
    pub reason: String,
}

/// The outcome of a bulk grant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GrantReport {
    /// Recipients successfully credited.
    pub granted: usize,
    /// Per-recipient problems, collected rather than fail-fast.
    pub errors: Vec<String>,
}
