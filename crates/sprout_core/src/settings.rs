//! # Tunable Settings
//!
//! Every balance number in the system lives here: level curve, ingestion
//! coefficients, gacha costs and weights, bonus amounts. Loadable from TOML
//! for deployment seeding, and patchable one flat key/value pair at a time
//! so teachers can tune individual values at runtime.
//!
//! Settings are re-read from the store at the start of every operation;
//! nothing caches them across operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing or patching settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// A flat-map patch referenced a key the settings schema doesn't have.
    #[error("unknown settings key: {0}")]
    UnknownKey(String),

    /// A flat-map patch carried a value that doesn't parse for its key.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// The key being patched.
        key: String,
        /// The rejected raw value.
        value: String,
    },

    /// TOML deserialization failed.
    #[error("invalid settings file: {0}")]
    InvalidToml(String),
}

/// The linear level staircase: level 1 requires `base` experience, and each
/// subsequent level requires `increment` more than the one before.
///
/// Unsigned fields make a negative increment unrepresentable, which is what
/// guarantees the level walk terminates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelCurve {
    /// Experience required to clear level 1.
    pub base: u64,
    /// Additional requirement added at each subsequent level.
    pub increment: u64,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self { base: 100, increment: 50 }
    }
}

/// Integer weights for the three rarity buckets, in sampling order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GachaWeights {
    /// Weight of the N bucket.
    pub normal: u32,
    /// Weight of the R bucket.
    pub rare: u32,
    /// Weight of the SR bucket.
    pub super_rare: u32,
}

impl GachaWeights {
    /// Sum of all bucket weights.
    #[must_use]
    pub const fn total(self) -> u32 {
        self.normal + self.rare + self.super_rare
    }
}

impl Default for GachaWeights {
    fn default() -> Self {
        Self { normal: 70, rare: 25, super_rare: 5 }
    }
}

/// Exchange points credited when a gacha draw duplicates an owned item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatePoints {
    /// Conversion for N items.
    pub normal: i64,
    /// Conversion for R items.
    pub rare: i64,
    /// Conversion for SR items.
    pub super_rare: i64,
}

impl Default for DuplicatePoints {
    fn default() -> Self {
        Self { normal: 10, rare: 30, super_rare: 100 }
    }
}

/// The full tunable configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Level staircase parameters.
    pub level: LevelCurve,
    /// Experience credited by the daily login bonus.
    pub login_bonus_exp: i64,
    /// Flat experience per class reflection row.
    pub reflection_exp: i64,
    /// Flat experience per moral note row.
    pub moral_note_exp: i64,
    /// Flat experience per self-study row.
    pub self_study_exp: i64,
    /// Flat experience per growth log row.
    pub growth_log_exp: i64,
    /// Coefficient for the squared-score test reflection formula.
    pub test_score_coef: f64,
    /// Coefficient for the typing practice formula.
    pub typing_coef: f64,
    /// Coefficient for the reading log pages formula.
    pub reading_page_coef: f64,
    /// Seconds-per-penalty-point divisor for arithmetic drills.
    pub drill_time_divisor: u32,
    /// Spendable-experience cost of a single gacha play.
    pub gacha_cost: i64,
    /// Spendable-experience cost of a ten-pull.
    pub gacha_ten_cost: i64,
    /// Rarity bucket weights.
    pub gacha_weights: GachaWeights,
    /// Duplicate-conversion point amounts per rarity.
    pub duplicate_points: DuplicatePoints,
    /// Number of entries in the experience ranking.
    pub ranking_size: usize,
    /// Number of entries in the recent-activity feed.
    pub activity_feed_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: LevelCurve::default(),
            login_bonus_exp: 10,
            reflection_exp: 20,
            moral_note_exp: 15,
            self_study_exp: 20,
            growth_log_exp: 10,
            test_score_coef: 0.1,
            typing_coef: 0.5,
            reading_page_coef: 2.0,
            drill_time_divisor: 10,
            gacha_cost: 100,
            gacha_ten_cost: 1000,
            gacha_weights: GachaWeights::default(),
            duplicate_points: DuplicatePoints::default(),
            ranking_size: 10,
            activity_feed_size: 20,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML document. Missing keys fall back to
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidToml`] when the document doesn't
    /// parse.
    pub fn from_toml_str(doc: &str) -> Result<Self, SettingsError> {
        toml::from_str(doc).map_err(|e| SettingsError::InvalidToml(e.to_string()))
    }

    /// Applies one flat key/value pair, the shape the runtime tuning surface
    /// speaks.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownKey`] for keys outside the schema and
    /// [`SettingsError::InvalidValue`] when the value doesn't parse.
    pub fn apply_key(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
            value.trim().parse().map_err(|_| SettingsError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        }

        match key.trim() {
            "level_base" => self.level.base = parse(key, value)?,
            "level_increment" => self.level.increment = parse(key, value)?,
            "login_bonus_exp" => self.login_bonus_exp = parse(key, value)?,
            "reflection_exp" => self.reflection_exp = parse(key, value)?,
            "moral_note_exp" => self.moral_note_exp = parse(key, value)?,
            "self_study_exp" => self.self_study_exp = parse(key, value)?,
            "growth_log_exp" => self.growth_log_exp = parse(key, value)?,
            "test_score_coef" => self.test_score_coef = parse(key, value)?,
            "typing_coef" => self.typing_coef = parse(key, value)?,
            "reading_page_coef" => self.reading_page_coef = parse(key, value)?,
            "drill_time_divisor" => self.drill_time_divisor = parse(key, value)?,
            "gacha_cost" => self.gacha_cost = parse(key, value)?,
            "gacha_ten_cost" => self.gacha_ten_cost = parse(key, value)?,
            "gacha_weight_n" => self.gacha_weights.normal = parse(key, value)?,
            "gacha_weight_r" => self.gacha_weights.rare = parse(key, value)?,
            "gacha_weight_sr" => self.gacha_weights.super_rare = parse(key, value)?,
            "dup_points_n" => self.duplicate_points.normal = parse(key, value)?,
            "dup_points_r" => self.duplicate_points.rare = parse(key, value)?,
            "dup_points_sr" => self.duplicate_points.super_rare = parse(key, value)?,
            "ranking_size" => self.ranking_size = parse(key, value)?,
            "activity_feed_size" => self.activity_feed_size = parse(key, value)?,
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}
