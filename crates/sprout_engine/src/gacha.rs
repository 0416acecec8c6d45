//! # Gacha and Exchange Engine
//!
//! Weighted random item draws paid with spendable experience, plus direct
//! purchases paid with exchange points.
//!
//! A draw samples a rarity tier by configured weight, then picks uniformly
//! within that tier. Drawing an item the user already owns converts it into
//! exchange points on the duplicate schedule for its rarity instead of a
//! second copy. A ten-pull is ten sequential draws paid up front at the
//! bundle price; a repeat within the same bundle counts as a duplicate even
//! though the first copy has not been committed yet.
//!
//! The balance check happens before any state is touched, and all writes
//! for one play land together after the draws, so a failed play leaves no
//! trace.

use std::collections::BTreeSet;

use rand::Rng;
use tracing::debug;

use chrono::NaiveDateTime;
use sprout_core::{
    DuplicatePoints, EventDetail, EventLogEntry, GachaWeights, Item, ItemId, Rarity, Settings,
};
use sprout_store::GameStore;

use crate::error::{EngineError, EngineResult};

/// The result of one draw, before wallet totals are applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawOutcome {
    /// The item that came up.
    pub item: Item,
    /// Whether the user already owned it (in the store or earlier in the
    /// same bundle).
    pub duplicate: bool,
    /// Exchange points credited for a duplicate; zero for a new item.
    pub points: i64,
}

/// The result of a paid play, with the wallet after all writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GachaPlayResult {
    /// One outcome per draw: one for a single play, ten for a ten-pull.
    pub outcomes: Vec<DrawOutcome>,
    /// Spendable experience remaining after the cost was debited.
    pub spendable_exp: i64,
    /// Exchange points after duplicate conversions were credited.
    pub exchange_points: i64,
}

fn duplicate_points(rarity: Rarity, schedule: &DuplicatePoints) -> i64 {
    match rarity {
        Rarity::N => schedule.normal,
        Rarity::R => schedule.rare,
        Rarity::SR => schedule.super_rare,
    }
}

fn weight_of(rarity: Rarity, weights: &GachaWeights) -> u32 {
    match rarity {
        Rarity::N => weights.normal,
        Rarity::R => weights.rare,
        Rarity::SR => weights.super_rare,
    }
}

/// Draws one item from the catalog.
///
/// Only rarity-bearing items participate. Rarity is sampled by weight; a
/// zero-weight tier is never chosen while any weight is positive. If every
/// weight is zero, or the sampled tier has no items in the catalog, the
/// draw falls back to a uniform pick over the whole pool so a sparse
/// catalog can never brick the machine.
///
/// # Errors
///
/// [`EngineError::EmptyCatalog`] when no catalog item carries a rarity.
pub fn draw_item<R: Rng + ?Sized>(
    catalog: &[Item],
    weights: &GachaWeights,
    rng: &mut R,
) -> EngineResult<Item> {
    let pool: Vec<&Item> = catalog.iter().filter(|i| i.rarity.is_some()).collect();
    if pool.is_empty() {
        return Err(EngineError::EmptyCatalog);
    }

    let total = weights.total();
    if total > 0 {
        let mut roll = rng.gen_range(0..total);
        for rarity in Rarity::ALL {
            let weight = weight_of(rarity, weights);
            if roll < weight {
                let tier: Vec<&Item> =
                    pool.iter().copied().filter(|i| i.rarity == Some(rarity)).collect();
                if !tier.is_empty() {
                    return Ok(tier[rng.gen_range(0..tier.len())].clone());
                }
                // Sampled tier has no stock; fall through to the uniform pick.
                break;
            }
            roll -= weight;
        }
    }

    Ok(pool[rng.gen_range(0..pool.len())].clone())
}

/// Plays the gacha once.
///
/// Debits `gacha_cost` spendable experience, draws, and either adds the
/// item to the inventory or converts the duplicate into exchange points.
/// All writes land together after the draw.
///
/// # Errors
///
/// [`EngineError::InsufficientBalance`] when the wallet is short;
/// [`EngineError::UserNotFound`] for an unknown user;
/// [`EngineError::EmptyCatalog`] when nothing is drawable.
pub fn play_gacha<R: Rng + ?Sized>(
    store: &mut dyn GameStore,
    user_id: &str,
    settings: &Settings,
    rng: &mut R,
    now: NaiveDateTime,
) -> EngineResult<GachaPlayResult> {
    let mut user = store
        .user(user_id)?
        .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
    if user.spendable_exp < settings.gacha_cost {
        return Err(EngineError::InsufficientBalance {
            cost: settings.gacha_cost,
            balance: user.spendable_exp,
        });
    }

    let catalog = store.items()?;
    let owned = store.inventory(user_id)?;
    let item = draw_item(&catalog, &settings.gacha_weights, rng)?;

    user.spendable_exp -= settings.gacha_cost;

    let outcome = if owned.contains(&item.id) {
        let points = item
            .rarity
            .map_or(0, |r| duplicate_points(r, &settings.duplicate_points));
        user.exchange_points += points;
        store.append_events(vec![EventLogEntry::new(
            now,
            user_id.to_string(),
            EventDetail::GachaDuplicate { item_id: item.id.clone(), points },
        )])?;
        DrawOutcome { item, duplicate: true, points }
    } else {
        store.add_inventory(user_id, &[item.id.clone()])?;
        store.append_events(vec![EventLogEntry::new(
            now,
            user_id.to_string(),
            EventDetail::GachaPlay { item_id: item.id.clone() },
        )])?;
        DrawOutcome { item, duplicate: false, points: 0 }
    };

    debug!(user = user_id, item = %outcome.item.id, duplicate = outcome.duplicate, "gacha play");

    store.put_user(user.clone())?;
    Ok(GachaPlayResult {
        outcomes: vec![outcome],
        spendable_exp: user.spendable_exp,
        exchange_points: user.exchange_points,
    })
}

/// Plays the gacha ten times for the bundle price.
///
/// The whole bundle is paid up front; insufficient balance rejects before
/// any draw. A repeat within the bundle converts like a stored duplicate.
/// One summary event covers the bundle.
///
/// # Errors
///
/// Same conditions as [`play_gacha`], checked against `gacha_ten_cost`.
#[allow(clippy::cast_possible_truncation)]
pub fn play_gacha_ten<R: Rng + ?Sized>(
    store: &mut dyn GameStore,
    user_id: &str,
    settings: &Settings,
    rng: &mut R,
    now: NaiveDateTime,
) -> EngineResult<GachaPlayResult> {
    let mut user = store
        .user(user_id)?
        .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
    if user.spendable_exp < settings.gacha_ten_cost {
        return Err(EngineError::InsufficientBalance {
            cost: settings.gacha_ten_cost,
            balance: user.spendable_exp,
        });
    }

    let catalog = store.items()?;
    let mut seen: BTreeSet<ItemId> = store.inventory(user_id)?;
    user.spendable_exp -= settings.gacha_ten_cost;

    let mut outcomes = Vec::with_capacity(10);
    let mut new_items: Vec<ItemId> = Vec::new();
    for _ in 0..10 {
        let item = draw_item(&catalog, &settings.gacha_weights, rng)?;
        if seen.contains(&item.id) {
            let points = item
                .rarity
                .map_or(0, |r| duplicate_points(r, &settings.duplicate_points));
            user.exchange_points += points;
            outcomes.push(DrawOutcome { item, duplicate: true, points });
        } else {
            seen.insert(item.id.clone());
            new_items.push(item.id.clone());
            outcomes.push(DrawOutcome { item, duplicate: false, points: 0 });
        }
    }

    store.add_inventory(user_id, &new_items)?;
    let duplicates = outcomes.iter().filter(|o| o.duplicate).count() as u32;
    store.append_events(vec![EventLogEntry::new(
        now,
        user_id.to_string(),
        EventDetail::GachaTenPull { new_items: 10 - duplicates, duplicates },
    )])?;
    store.put_user(user.clone())?;

    debug!(user = user_id, duplicates, "gacha ten-pull");

    Ok(GachaPlayResult {
        outcomes,
        spendable_exp: user.spendable_exp,
        exchange_points: user.exchange_points,
    })
}

/// Buys a catalog item directly with exchange points.
///
/// # Errors
///
/// [`EngineError::ItemNotFound`] for an unknown id;
/// [`EngineError::ItemNotPurchasable`] when the item carries no cost;
/// [`EngineError::ItemAlreadyOwned`] when it is already in the inventory;
/// [`EngineError::InsufficientPoints`] when the wallet is short;
/// [`EngineError::UserNotFound`] for an unknown user.
pub fn exchange_item(
    store: &mut dyn GameStore,
    user_id: &str,
    item_id: &str,
    now: NaiveDateTime,
) -> EngineResult<Item> {
    let item = store
        .items()?
        .into_iter()
        .find(|i| i.id == item_id)
        .ok_or_else(|| EngineError::ItemNotFound(item_id.to_string()))?;
    let cost = item
        .cost
        .ok_or_else(|| EngineError::ItemNotPurchasable(item_id.to_string()))?;

    if store.inventory(user_id)?.contains(&item.id) {
        return Err(EngineError::ItemAlreadyOwned(item_id.to_string()));
    }

    let mut user = store
        .user(user_id)?
        .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
    if user.exchange_points < cost {
        return Err(EngineError::InsufficientPoints { cost, balance: user.exchange_points });
    }

    user.exchange_points -= cost;
    store.put_user(user)?;
    store.add_inventory(user_id, &[item.id.clone()])?;
    store.append_events(vec![EventLogEntry::new(
        now,
        user_id.to_string(),
        EventDetail::ItemExchange { item_id: item.id.clone(), cost },
    )])?;

    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sprout_core::User;
    use sprout_store::MemoryStore;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 5).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn item(id: &str, rarity: Option<Rarity>) -> Item {
        Item {
            id: id.to_string(),
            name: id.to_string(),
            category: "hat".to_string(),
            rarity,
            cost: None,
            image: String::new(),
        }
    }

    fn stocked_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.seed_item(item("n-1", Some(Rarity::N)));
        store.seed_item(item("n-2", Some(Rarity::N)));
        store.seed_item(item("r-1", Some(Rarity::R)));
        store.seed_item(item("sr-1", Some(Rarity::SR)));
        store
    }

    fn rich_user(id: &str, exp: i64) -> User {
        let mut user = User::new(id);
        user.spendable_exp = exp;
        user
    }

    #[test]
    fn test_draw_weight_distribution_converges() {
        let catalog = stocked_store().items().unwrap();
        let weights = GachaWeights::default(); // 70 / 25 / 5
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut counts = [0u32; 3];
        for _ in 0..20_000 {
            let item = draw_item(&catalog, &weights, &mut rng).unwrap();
            match item.rarity.unwrap() {
                Rarity::N => counts[0] += 1,
                Rarity::R => counts[1] += 1,
                Rarity::SR => counts[2] += 1,
            }
        }
        // Generous tolerance: 20k draws keep each tier within a couple of
        // points of its weight.
        let pct = |c: u32| f64::from(c) / 200.0;
        assert!((pct(counts[0]) - 70.0).abs() < 3.0, "N at {}%", pct(counts[0]));
        assert!((pct(counts[1]) - 25.0).abs() < 3.0, "R at {}%", pct(counts[1]));
        assert!((pct(counts[2]) - 5.0).abs() < 2.0, "SR at {}%", pct(counts[2]));
    }

    #[test]
    fn test_zero_weight_tier_never_drawn() {
        let catalog = stocked_store().items().unwrap();
        let weights = GachaWeights { normal: 1, rare: 1, super_rare: 0 };
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..2_000 {
            let item = draw_item(&catalog, &weights, &mut rng).unwrap();
            assert_ne!(item.rarity, Some(Rarity::SR));
        }
    }

    #[test]
    fn test_all_zero_weights_fall_back_to_uniform() {
        let catalog = stocked_store().items().unwrap();
        let weights = GachaWeights { normal: 0, rare: 0, super_rare: 0 };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        // Must not error or loop; any catalog item is acceptable.
        draw_item(&catalog, &weights, &mut rng).unwrap();
    }

    #[test]
    fn test_empty_tier_falls_back_to_uniform() {
        let mut store = MemoryStore::new();
        store.seed_item(item("n-1", Some(Rarity::N)));
        let catalog = store.items().unwrap();
        // SR guaranteed by weight, but no SR in stock.
        let weights = GachaWeights { normal: 0, rare: 0, super_rare: 1 };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let drawn = draw_item(&catalog, &weights, &mut rng).unwrap();
        assert_eq!(drawn.id, "n-1");
    }

    #[test]
    fn test_no_rarity_items_are_not_drawable() {
        let mut store = MemoryStore::new();
        store.seed_item(item("shop-only", None));
        let catalog = store.items().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = draw_item(&catalog, &GachaWeights::default(), &mut rng).unwrap_err();
        assert_eq!(err, EngineError::EmptyCatalog);
    }

    #[test]
    fn test_play_debits_exact_balance_and_rejects_one_below() {
        let settings = Settings::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let mut store = stocked_store();
        store.put_user(rich_user("a@school", settings.gacha_cost)).unwrap();
        let result = play_gacha(&mut store, "a@school", &settings, &mut rng, now()).unwrap();
        assert_eq!(result.spendable_exp, 0);
        assert_eq!(result.outcomes.len(), 1);

        let mut store = stocked_store();
        store.put_user(rich_user("b@school", settings.gacha_cost - 1)).unwrap();
        let err = play_gacha(&mut store, "b@school", &settings, &mut rng, now()).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { .. }));
        // A rejected play leaves the wallet untouched.
        let user = store.user("b@school").unwrap().unwrap();
        assert_eq!(user.spendable_exp, settings.gacha_cost - 1);
    }

    #[test]
    fn test_duplicate_converts_to_points() {
        let settings = Settings::default();
        let mut store = MemoryStore::new();
        // Single-item catalog makes every draw after the first a duplicate.
        store.seed_item(item("n-1", Some(Rarity::N)));
        store.put_user(rich_user("a@school", settings.gacha_cost * 2)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let first = play_gacha(&mut store, "a@school", &settings, &mut rng, now()).unwrap();
        assert!(!first.outcomes[0].duplicate);

        let second = play_gacha(&mut store, "a@school", &settings, &mut rng, now()).unwrap();
        assert!(second.outcomes[0].duplicate);
        assert_eq!(second.outcomes[0].points, settings.duplicate_points.normal);
        assert_eq!(second.exchange_points, settings.duplicate_points.normal);

        // The inventory still holds exactly one copy.
        assert_eq!(store.inventory("a@school").unwrap().len(), 1);
    }

    #[test]
    fn test_ten_pull_counts_in_bundle_duplicates() {
        let settings = Settings::default();
        let mut store = MemoryStore::new();
        store.seed_item(item("n-1", Some(Rarity::N)));
        store.put_user(rich_user("a@school", settings.gacha_ten_cost)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let result = play_gacha_ten(&mut store, "a@school", &settings, &mut rng, now()).unwrap();
        assert_eq!(result.outcomes.len(), 10);
        // One new item, nine in-bundle duplicates.
        assert_eq!(result.outcomes.iter().filter(|o| o.duplicate).count(), 9);
        assert_eq!(result.exchange_points, 9 * settings.duplicate_points.normal);
        assert_eq!(result.spendable_exp, 0);

        // The inventory gets exactly the one new item, in one write.
        let inventory = store.inventory("a@school").unwrap();
        assert_eq!(inventory.len(), 1);
        assert!(inventory.contains("n-1"));

        // The bundle logs a single summary event.
        let events = store.events().unwrap();
        let pulls: Vec<_> = events
            .iter()
            .filter(|e| matches!(e.detail, EventDetail::GachaTenPull { .. }))
            .collect();
        assert_eq!(pulls.len(), 1);
        assert_eq!(
            pulls[0].detail,
            EventDetail::GachaTenPull { new_items: 1, duplicates: 9 }
        );
    }

    #[test]
    fn test_exchange_validations() {
        let mut store = MemoryStore::new();
        let mut priced = item("badge-frame", None);
        priced.cost = Some(50);
        store.seed_item(priced);
        store.seed_item(item("gacha-only", Some(Rarity::N)));

        let mut user = User::new("a@school");
        user.exchange_points = 50;
        store.put_user(user).unwrap();

        let err = exchange_item(&mut store, "a@school", "missing", now()).unwrap_err();
        assert!(matches!(err, EngineError::ItemNotFound(_)));

        let err = exchange_item(&mut store, "a@school", "gacha-only", now()).unwrap_err();
        assert!(matches!(err, EngineError::ItemNotPurchasable(_)));

        let bought = exchange_item(&mut store, "a@school", "badge-frame", now()).unwrap();
        assert_eq!(bought.id, "badge-frame");
        assert_eq!(store.user("a@school").unwrap().unwrap().exchange_points, 0);

        let err = exchange_item(&mut store, "a@school", "badge-frame", now()).unwrap_err();
        assert!(matches!(err, EngineError::ItemAlreadyOwned(_)));
    }

    #[test]
    fn test_exchange_insufficient_points() {
        let mut store = MemoryStore::new();
        let mut priced = item("badge-frame", None);
        priced.cost = Some(50);
        store.seed_item(priced);
        let mut user = User::new("a@school");
        user.exchange_points = 49;
        store.put_user(user).unwrap();

        let err = exchange_item(&mut store, "a@school", "badge-frame", now()).unwrap_err();
        assert_eq!(err, EngineError::InsufficientPoints { cost: 50, balance: 49 });
    }
}
