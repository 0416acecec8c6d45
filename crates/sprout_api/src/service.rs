//! # Game Service
//!
//! The facade every UI request goes through. One method per operation the
//! UI calls; each wraps its result in an [`ApiEnvelope`] so no failure ever
//! propagates past this layer.
//!
//! ## Concurrency
//!
//! The store promises no isolation, so the service serializes instead:
//! mutations acquire a per-user mutex before touching the store, and all
//! store access goes through one `RwLock`. Balance updates are therefore
//! read-modify-write under exclusive access, never a lost-update race.
//! The per-user mutex is held across the whole operation; the store lock
//! is always acquired after it, and user mutexes are never nested, so the
//! ordering cannot deadlock.
//!
//! ## Settings
//!
//! Every operation re-reads settings from the store before acting. A
//! teacher tuning a rate takes effect on the next request, with no restart
//! and no cache to invalidate.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use sprout_core::{
    Announcement, AvatarComposition, EventDetail, EventLogEntry, Item, RewardKind, Settings, User,
    UserId,
};
use sprout_engine::{
    apply_login_bonus, calculate_level, check_and_award_badges, check_missions,
    claim_mission_reward, exchange_item, play_gacha, play_gacha_ten, run_batch, BatchReport,
    MissionStatus,
};
use sprout_store::GameStore;

use crate::envelope::ApiEnvelope;
use crate::error::{ApiError, ApiResult};
use crate::payload::{
    ActivityEntry, BadgeView, GachaView, GameData, GrantReport, GrantRequest, ProfileView,
    RankingEntry, StudentDetails, StudentSummary, TeacherData,
};

/// The application service. One instance per process.
pub struct GameService<S: GameStore> {
    store: RwLock<S>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl<S: GameStore> GameService<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store: RwLock::new(store), user_locks: Mutex::new(HashMap::new()) }
    }

    /// The mutex serializing mutations for one user.
    fn user_lock(&self, user: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock();
        Arc::clone(locks.entry(user.to_string()).or_default())
    }

    fn profile_view(user: &User, settings: &Settings) -> ProfileView {
        let standing = calculate_level(user.cumulative_exp, &settings.level);
        ProfileView {
            id: user.id.clone(),
            nickname: user.nickname.clone(),
            role: user.role,
            level: standing.level,
            progress_percent: standing.progress_percent,
            cumulative_exp: user.cumulative_exp,
            spendable_exp: user.spendable_exp,
            exchange_points: user.exchange_points,
        }
    }

    fn rankings(store: &S, settings: &Settings) -> ApiResult<Vec<RankingEntry>> {
        let mut students: Vec<User> =
            store.users()?.into_iter().filter(|u| !u.is_teacher()).collect();
        students.sort_by(|a, b| b.cumulative_exp.cmp(&a.cumulative_exp));
        Ok(students
            .into_iter()
            .take(settings.ranking_size)
            .map(|u| RankingEntry {
                level: calculate_level(u.cumulative_exp, &settings.level).level,
                nickname: u.nickname,
                cumulative_exp: u.cumulative_exp,
            })
            .collect())
    }

    /// Newest non-internal activity lines for one user, newest first.
    fn recent_activity(store: &S, user: &str, limit: usize) -> ApiResult<Vec<ActivityEntry>> {
        Ok(store
            .events()?
            .into_iter()
            .rev()
            .filter(|e| e.user == user && !e.detail.is_internal())
            .take(limit)
            .map(|e| ActivityEntry { at: e.at, message: e.detail.render_message() })
            .collect())
    }

    fn earned_badge_views(store: &S, user: &str) -> ApiResult<Vec<BadgeView>> {
        let catalog = store.badges()?;
        Ok(store
            .earned_badges(user)?
            .into_iter()
            .filter_map(|earned| {
                catalog.iter().find(|d| d.id == earned.badge_id).map(|d| BadgeView {
                    id: d.id.clone(),
                    name: d.name.clone(),
                    description: d.description.clone(),
                    earned_at: earned.at,
                })
            })
            .collect())
    }

    fn require_teacher(store: &S, caller: &str) -> ApiResult<()> {
        match store.user(caller)? {
            Some(user) if user.is_teacher() => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }

    // ------------------------------------------------------------------
    // Student surface
    // ------------------------------------------------------------------

    /// The aggregated bootstrap payload. Creates the user on first login
    /// and applies the daily login bonus and badge check.
    pub fn get_game_data(&self, user_id: &str, now: NaiveDateTime) -> ApiEnvelope<GameData> {
        ApiEnvelope::from_result("get_game_data", self.get_game_data_inner(user_id, now))
    }

    fn get_game_data_inner(&self, user_id: &str, now: NaiveDateTime) -> ApiResult<GameData> {
        let guard = self.user_lock(user_id);
        let _held = guard.lock();
        let mut store = self.store.write();
        let settings = store.settings()?;

        if store.user(user_id)?.is_none() {
            info!(user = user_id, "created account on first login");
            store.put_user(User::new(user_id))?;
        }

        let login_bonus = apply_login_bonus(&mut *store, user_id, &settings, now)?;
        let badges = check_and_award_badges(&mut *store, user_id, &settings, now)?;
        let missions = check_missions(&*store, user_id, now)?;

        // Re-read: the bonus and badge passes may have changed balances.
        let user = store
            .user(user_id)?
            .ok_or_else(|| ApiError::UnknownUser(user_id.to_string()))?;

        Ok(GameData {
            profile: Self::profile_view(&user, &settings),
            inventory: store.inventory(user_id)?.into_iter().collect(),
            avatar: store.avatar(user_id)?,
            catalog: store.items()?,
            missions,
            badges: badges
                .earned
                .into_iter()
                .map(|v| BadgeView {
                    id: v.badge.id,
                    name: v.badge.name,
                    description: v.badge.description,
                    earned_at: v.earned_at,
                })
                .collect(),
            rankings: Self::rankings(&store, &settings)?,
            recent_activity: Self::recent_activity(&store, user_id, settings.activity_feed_size)?,
            announcements: store.announcements()?,
            login_bonus,
        })
    }

    /// Saves the caller's profile fields and re-checks badges.
    pub fn save_profile(
        &self,
        user_id: &str,
        nickname: &str,
        now: NaiveDateTime,
    ) -> ApiEnvelope<ProfileView> {
        ApiEnvelope::from_result(
            "save_profile",
            self.save_profile_inner(user_id, nickname, now),
        )
    }

    fn save_profile_inner(
        &self,
        user_id: &str,
        nickname: &str,
        now: NaiveDateTime,
    ) -> ApiResult<ProfileView> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(ApiError::InvalidInput("nickname must not be empty".to_string()));
        }

        let guard = self.user_lock(user_id);
        let _held = guard.lock();
        let mut store = self.store.write();
        let settings = store.settings()?;

        let mut user = store
            .user(user_id)?
            .ok_or_else(|| ApiError::UnknownUser(user_id.to_string()))?;
        user.nickname = nickname.to_string();
        store.put_user(user.clone())?;
        store.append_events(vec![EventLogEntry::new(
            now,
            user_id.to_string(),
            EventDetail::ProfileSave,
        )])?;
        check_and_award_badges(&mut *store, user_id, &settings, now)?;

        Ok(Self::profile_view(&user, &settings))
    }

    /// Saves the caller's avatar composition. Every equipped item must be
    /// owned.
    pub fn save_avatar(
        &self,
        user_id: &str,
        composition: AvatarComposition,
        now: NaiveDateTime,
    ) -> ApiEnvelope<AvatarComposition> {
        ApiEnvelope::from_result(
            "save_avatar",
            self.save_avatar_inner(user_id, composition, now),
        )
    }

    fn save_avatar_inner(
        &self,
        user_id: &str,
        composition: AvatarComposition,
        now: NaiveDateTime,
    ) -> ApiResult<AvatarComposition> {
        let guard = self.user_lock(user_id);
        let _held = guard.lock();
        let mut store = self.store.write();
        let settings = store.settings()?;

        let owned = store.inventory(user_id)?;
        if let Some(item_id) = composition.values().find(|id| !owned.contains(*id)) {
            return Err(ApiError::InvalidInput(format!("item not owned: {item_id}")));
        }

        store.save_avatar(user_id, composition.clone())?;
        store.append_events(vec![EventLogEntry::new(
            now,
            user_id.to_string(),
            EventDetail::AvatarSave,
        )])?;
        check_and_award_badges(&mut *store, user_id, &settings, now)?;

        Ok(composition)
    }

    /// Claims a completed mission's reward.
    pub fn claim_mission_reward(
        &self,
        user_id: &str,
        mission_id: &str,
        now: NaiveDateTime,
    ) -> ApiEnvelope<MissionStatus> {
        ApiEnvelope::from_result("claim_mission_reward", {
            let guard = self.user_lock(user_id);
            let _held = guard.lock();
            let mut store = self.store.write();
            claim_mission_reward(&mut *store, user_id, mission_id, now).map_err(ApiError::from)
        })
    }

    /// Plays the gacha once.
    pub fn play_gacha(&self, user_id: &str, now: NaiveDateTime) -> ApiEnvelope<GachaView> {
        ApiEnvelope::from_result("play_gacha", self.play_gacha_inner(user_id, false, now))
    }

    /// Plays the gacha ten times for the bundle price.
    pub fn play_gacha_ten(&self, user_id: &str, now: NaiveDateTime) -> ApiEnvelope<GachaView> {
        ApiEnvelope::from_result("play_gacha_ten", self.play_gacha_inner(user_id, true, now))
    }

    fn play_gacha_inner(
        &self,
        user_id: &str,
        ten: bool,
        now: NaiveDateTime,
    ) -> ApiResult<GachaView> {
        let guard = self.user_lock(user_id);
        let _held = guard.lock();
        let mut store = self.store.write();
        let settings = store.settings()?;
        let mut rng = StdRng::from_entropy();

        let result = if ten {
            play_gacha_ten(&mut *store, user_id, &settings, &mut rng, now)?
        } else {
            play_gacha(&mut *store, user_id, &settings, &mut rng, now)?
        };
        Ok(result.into())
    }

    /// Buys a catalog item with exchange points.
    pub fn exchange_item(
        &self,
        user_id: &str,
        item_id: &str,
        now: NaiveDateTime,
    ) -> ApiEnvelope<Item> {
        ApiEnvelope::from_result("exchange_item", {
            let guard = self.user_lock(user_id);
            let _held = guard.lock();
            let mut store = self.store.write();
            exchange_item(&mut *store, user_id, item_id, now).map_err(ApiError::from)
        })
    }

    // ------------------------------------------------------------------
    // Teacher surface
    // ------------------------------------------------------------------

    /// The teacher dashboard: class overview, announcements, settings.
    pub fn get_teacher_data(&self, caller: &str) -> ApiEnvelope<TeacherData> {
        ApiEnvelope::from_result("get_teacher_data", self.get_teacher_data_inner(caller))
    }

    fn get_teacher_data_inner(&self, caller: &str) -> ApiResult<TeacherData> {
        let store = self.store.read();
        Self::require_teacher(&store, caller)?;
        let settings = store.settings()?;

        let mut students = Vec::new();
        for user in store.users()?.into_iter().filter(|u| !u.is_teacher()) {
            let badges_earned = store.earned_badges(&user.id)?.len();
            students.push(StudentSummary {
                level: calculate_level(user.cumulative_exp, &settings.level).level,
                id: user.id,
                nickname: user.nickname,
                cumulative_exp: user.cumulative_exp,
                spendable_exp: user.spendable_exp,
                exchange_points: user.exchange_points,
                last_login: user.last_login,
                badges_earned,
            });
        }

        Ok(TeacherData { students, announcements: store.announcements()?, settings })
    }

    /// Drill-down for one student.
    pub fn get_student_details(
        &self,
        caller: &str,
        student_id: &str,
    ) -> ApiEnvelope<StudentDetails> {
        ApiEnvelope::from_result(
            "get_student_details",
            self.get_student_details_inner(caller, student_id),
        )
    }

    fn get_student_details_inner(
        &self,
        caller: &str,
        student_id: &str,
    ) -> ApiResult<StudentDetails> {
        let store = self.store.read();
        Self::require_teacher(&store, caller)?;
        let settings = store.settings()?;

        let user = store
            .user(student_id)?
            .ok_or_else(|| ApiError::UnknownUser(student_id.to_string()))?;

        Ok(StudentDetails {
            profile: Self::profile_view(&user, &settings),
            badges: Self::earned_badge_views(&store, student_id)?,
            recent_activity: Self::recent_activity(
                &store,
                student_id,
                settings.activity_feed_size,
            )?,
            inventory_size: store.inventory(student_id)?.len(),
        })
    }

    /// Credits experience or points to a set of students. Per-recipient
    /// failures are collected, not fail-fast.
    pub fn grant_points(
        &self,
        caller: &str,
        request: &GrantRequest,
        now: NaiveDateTime,
    ) -> ApiEnvelope<GrantReport> {
        ApiEnvelope::from_result("grant_points", self.grant_points_inner(caller, request, now))
    }

    fn grant_points_inner(
        &self,
        caller: &str,
        request: &GrantRequest,
        now: NaiveDateTime,
    ) -> ApiResult<GrantReport> {
        let mut store = self.store.write();
        Self::require_teacher(&store, caller)?;
        // Cumulative experience only ever ratchets up; a negative grant
        // would silently break that.
        if request.amount <= 0 {
            return Err(ApiError::InvalidInput("grant amount must be positive".to_string()));
        }

        let mut report = GrantReport::default();
        for user_id in &request.user_ids {
            let mut user = match store.user(user_id) {
                Ok(Some(user)) => user,
                Ok(None) => {
                    report.errors.push(format!("user not found: {user_id}"));
                    continue;
                }
                Err(e) => {
                    report.errors.push(format!("lookup failed for {user_id}: {e}"));
                    continue;
                }
            };
            match request.kind {
                RewardKind::Exp => user.credit_exp(request.amount),
                RewardKind::Points => user.exchange_points += request.amount,
            }
            store.put_user(user)?;
            store.append_events(vec![EventLogEntry::new(
                now,
                user_id.clone(),
                EventDetail::PointGrant {
                    kind: request.kind,
                    amount: request.amount,
                    reason: request.reason.clone(),
                },
            )])?;
            report.granted += 1;
        }

        info!(caller, granted = report.granted, failed = report.errors.len(), "bulk grant");
        Ok(report)
    }

    /// Posts an announcement.
    pub fn post_announcement(
        &self,
        caller: &str,
        title: &str,
        body: &str,
        now: NaiveDateTime,
    ) -> ApiEnvelope<Announcement> {
        ApiEnvelope::from_result("post_announcement", {
            let mut store = self.store.write();
            Self::require_teacher(&store, caller)
                .and_then(|()| store.post_announcement(title, body, now).map_err(ApiError::from))
        })
    }

    /// Deletes an announcement by row reference.
    pub fn delete_announcement(&self, caller: &str, row: u64) -> ApiEnvelope<()> {
        ApiEnvelope::from_result("delete_announcement", {
            let mut store = self.store.write();
            Self::require_teacher(&store, caller)
                .and_then(|()| store.delete_announcement(row).map_err(ApiError::from))
        })
    }

    /// Patches individual settings keys. Any bad key or value aborts the
    /// whole patch; nothing is saved.
    pub fn update_config_settings(
        &self,
        caller: &str,
        patch: &[(String, String)],
    ) -> ApiEnvelope<Settings> {
        ApiEnvelope::from_result(
            "update_config_settings",
            self.update_config_settings_inner(caller, patch),
        )
    }

    fn update_config_settings_inner(
        &self,
        caller: &str,
        patch: &[(String, String)],
    ) -> ApiResult<Settings> {
        let mut store = self.store.write();
        Self::require_teacher(&store, caller)?;

        let mut settings = store.settings()?;
        for (key, value) in patch {
            settings.apply_key(key, value)?;
        }
        store.save_settings(&settings)?;
        info!(caller, keys = patch.len(), "settings updated");
        Ok(settings)
    }

    // ------------------------------------------------------------------
    // Scheduler surface
    // ------------------------------------------------------------------

    /// Runs one ingestion batch. Invoked by the scheduler; a failed run
    /// must leave the store consistent for the next one, which the
    /// all-or-nothing commit guarantees.
    pub fn run_scheduled_batch(&self, now: NaiveDateTime) -> ApiEnvelope<BatchReport> {
        ApiEnvelope::from_result("run_scheduled_batch", {
            let mut store = self.store.write();
            store
                .settings()
                .map_err(ApiError::from)
                .and_then(|settings| {
                    run_batch(&mut *store, &settings, now).map_err(ApiError::from)
                })
        })
    }

    /// Direct access to the wrapped store, for seeding catalogs and record
    /// submissions from outside the request path.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        f(&mut self.store.write())
    }
}
