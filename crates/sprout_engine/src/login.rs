//! Daily login bonus: the first visit of each calendar day credits a flat
//! amount of experience and stamps the user's last-login date.

use chrono::NaiveDateTime;
use tracing::debug;

use sprout_core::{EventDetail, EventLogEntry, Settings};
use sprout_store::GameStore;

use crate::error::{EngineError, EngineResult};

/// Credits the daily login bonus if today's hasn't been taken yet.
///
/// Returns the credited amount, or `None` when the user already logged in
/// today. The date stamp and the bonus always move together, so the bonus
/// can't double-fire within a day.
///
/// # Errors
///
/// [`EngineError::UserNotFound`] for an unknown user, or a store error.
pub fn apply_login_bonus(
    store: &mut dyn GameStore,
    user_id: &str,
    settings: &Settings,
    now: NaiveDateTime,
) -> EngineResult<Option<i64>> {
    let mut user = store
        .user(user_id)?
        .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;

    let today = now.date();
    if user.last_login == Some(today) {
        return Ok(None);
    }

    let amount = settings.login_bonus_exp;
    user.credit_exp(amount);
    user.last_login = Some(today);
    store.put_user(user)?;
    store.append_events(vec![EventLogEntry::new(
        now,
        user_id.to_string(),
        EventDetail::LoginBonus { amount },
    )])?;

    debug!(user = user_id, amount, "login bonus credited");
    Ok(Some(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sprout_core::User;
    use sprout_store::MemoryStore;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 5).unwrap().and_hms_opt(8, 30, 0).unwrap()
    }

    #[test]
    fn test_first_login_of_day_credits_once() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        let settings = Settings::default();

        let credited = apply_login_bonus(&mut store, "a@school", &settings, now()).unwrap();
        assert_eq!(credited, Some(settings.login_bonus_exp));

        // Later the same day: nothing.
        let later = now() + Duration::hours(6);
        let credited = apply_login_bonus(&mut store, "a@school", &settings, later).unwrap();
        assert_eq!(credited, None);

        let user = store.user("a@school").unwrap().unwrap();
        assert_eq!(user.cumulative_exp, settings.login_bonus_exp);
        assert_eq!(user.spendable_exp, settings.login_bonus_exp);
        assert_eq!(user.last_login, Some(now().date()));
    }

    #[test]
    fn test_next_day_credits_again() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("a@school")).unwrap();
        let settings = Settings::default();

        apply_login_bonus(&mut store, "a@school", &settings, now()).unwrap();
        let tomorrow = now() + Duration::days(1);
        let credited = apply_login_bonus(&mut store, "a@school", &settings, tomorrow).unwrap();
        assert_eq!(credited, Some(settings.login_bonus_exp));

        let user = store.user("a@school").unwrap().unwrap();
        assert_eq!(user.cumulative_exp, 2 * settings.login_bonus_exp);
    }

    #[test]
    fn test_unknown_user_rejected() {
        let mut store = MemoryStore::new();
        let err =
            apply_login_bonus(&mut store, "ghost@school", &Settings::default(), now()).unwrap_err();
        assert!(matches!(err, EngineError::UserNotFound(_)));
    }
}
