//! Engine error types.

use sprout_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the progression and reward engines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Not enough spendable experience for a gacha play.
    #[error("not enough experience: need {cost}, have {balance}")]
    InsufficientBalance {
        /// The amount required.
        cost: i64,
        /// The amount available.
        balance: i64,
    },

    /// Not enough exchange points for a purchase.
    #[error("not enough exchange points: need {cost}, have {balance}")]
    InsufficientPoints {
        /// The amount required.
        cost: i64,
        /// The amount available.
        balance: i64,
    },

    /// No user row for the given identifier.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// No enabled mission with the given id.
    #[error("mission not found: {0}")]
    MissionNotFound(String),

    /// Claim attempted before progress reached the target.
    #[error("mission not complete: {0}")]
    MissionNotComplete(String),

    /// Claim attempted after an earlier claim in the same window.
    #[error("mission already claimed: {0}")]
    MissionAlreadyClaimed(String),

    /// No catalog item with the given id.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// The item carries no exchange cost and cannot be purchased directly.
    #[error("item not purchasable: {0}")]
    ItemNotPurchasable(String),

    /// Direct purchase of an item the user already owns.
    #[error("item already owned: {0}")]
    ItemAlreadyOwned(String),

    /// The gacha catalog has no rarity-bearing items to draw from.
    #[error("gacha catalog is empty")]
    EmptyCatalog,

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
