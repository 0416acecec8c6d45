//! Item catalog and avatar composition types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a catalog item.
pub type ItemId = String;

/// Rarity bucket for gacha-eligible items.
///
/// The declared order matters: weighted sampling subtracts bucket weights in
/// this order, so it must stay `N`, `R`, `SR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    /// Normal - the bulk of draws (default weight 70).
    N,
    /// Rare (default weight 25).
    R,
    /// Super rare (default weight 5).
    SR,
}

impl Rarity {
    /// All buckets in declared sampling order.
    pub const ALL: [Self; 3] = [Self::N, Self::R, Self::SR];
}

/// A catalog entry. The catalog is static and read-only from the engines'
/// perspective; draws and exchanges hand out clones, never references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Category label (e.g. an avatar equipment slot).
    pub category: String,
    /// Rarity bucket. `None` for items outside the gacha pool.
    pub rarity: Option<Rarity>,
    /// Exchange-point cost for direct purchase. `None` when not purchasable.
    pub cost: Option<i64>,
    /// Image reference for the UI.
    pub image: String,
}

/// Mapping of equipment-slot name to equipped item id.
///
/// Last-write-wins, one composition per user.
pub type AvatarComposition = BTreeMap<String, ItemId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_order_is_sampling_order() {
        assert_eq!(Rarity::ALL, [Rarity::N, Rarity::R, Rarity::SR]);
    }
}
