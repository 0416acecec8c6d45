//! Learning-record source types.
//!
//! One [`SourceKind`] per learning-record sheet. Records are created
//! externally (form submissions) and consumed exactly once by the batch
//! ingestion engine, which flips the processed flag.

use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// The learning-record sheets the ingestion engine knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Daily class reflection entries.
    ClassReflection,
    /// Test reflections carrying two scores.
    TestReflection,
    /// Moral education notes.
    MoralNote,
    /// Typing practice results (speed and accuracy).
    Typing,
    /// Arithmetic drill results (score and elapsed time).
    ArithmeticDrill,
    /// Reading log entries (pages read).
    ReadingLog,
    /// Self-study reports.
    SelfStudy,
    /// Growth log entries.
    GrowthLog,
}

impl SourceKind {
    /// All kinds, in the fixed order the batch ingestion engine runs them.
    pub const ALL: [Self; 8] = [
        Self::ClassReflection,
        Self::TestReflection,
        Self::MoralNote,
        Self::Typing,
        Self::ArithmeticDrill,
        Self::ReadingLog,
        Self::SelfStudy,
        Self::GrowthLog,
    ];

    /// Human-readable label for logs and activity rendering.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ClassReflection => "class reflection",
            Self::TestReflection => "test reflection",
            Self::MoralNote => "moral note",
            Self::Typing => "typing practice",
            Self::ArithmeticDrill => "arithmetic drill",
            Self::ReadingLog => "reading log",
            Self::SelfStudy => "self-study",
            Self::GrowthLog => "growth log",
        }
    }
}

/// Type-specific metric fields for a learning record.
///
/// Each variant matches one [`SourceKind`]; the ingestion formula for the
/// kind reads exactly these fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMetrics {
    /// Class reflection - flat configured amount.
    ClassReflection,
    /// Test reflection - each score contributes `floor(coef * score^2)`
    /// independently.
    TestReflection {
        /// First test score.
        score1: u32,
        /// Second test score.
        score2: u32,
    },
    /// Moral note - flat amount.
    MoralNote,
    /// Typing practice - `floor(speed * (accuracy / 100) * coef)`.
    Typing {
        /// Characters per minute.
        speed: f64,
        /// Accuracy percentage in `[0, 100]`.
        accuracy: f64,
    },
    /// Arithmetic drill - `max(0, score - floor(seconds / time_divisor))`.
    ArithmeticDrill {
        /// Number of correct answers.
        score: u32,
        /// Elapsed time in seconds.
        seconds: u32,
    },
    /// Reading log - `floor(pages * coef)`.
    ReadingLog {
        /// Pages read.
        pages: u32,
    },
    /// Self-study - flat amount.
    SelfStudy,
    /// Growth log - flat amount.
    GrowthLog,
}

impl SourceMetrics {
    /// The sheet this metric set belongs to.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::ClassReflection => SourceKind::ClassReflection,
            Self::TestReflection { .. } => SourceKind::TestReflection,
            Self::MoralNote => SourceKind::MoralNote,
            Self::Typing { .. } => SourceKind::Typing,
            Self::ArithmeticDrill { .. } => SourceKind::ArithmeticDrill,
            Self::ReadingLog { .. } => SourceKind::ReadingLog,
            Self::SelfStudy => SourceKind::SelfStudy,
            Self::GrowthLog => SourceKind::GrowthLog,
        }
    }

    /// The primary metric value, used by max-value badge conditions.
    ///
    /// Returns `None` for flat-amount kinds that carry no number worth
    /// comparing.
    #[must_use]
    pub fn primary_metric(&self) -> Option<i64> {
        match self {
            Self::TestReflection { score1, score2 } => {
                Some(i64::from(*score1).max(i64::from(*score2)))
            }
            #[allow(clippy::cast_possible_truncation)]
            Self::Typing { speed, .. } => Some(speed.floor() as i64),
            Self::ArithmeticDrill { score, .. } => Some(i64::from(*score)),
            Self::ReadingLog { pages } => Some(i64::from(*pages)),
            Self::ClassReflection | Self::MoralNote | Self::SelfStudy | Self::GrowthLog => None,
        }
    }
}

/// One row of a learning-record sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Row reference within the kind's sheet. Stable for the lifetime of the
    /// row; the ingestion engine uses it to flip the processed flag.
    pub row: u64,
    /// Owning user.
    pub user: UserId,
    /// Type-specific metric fields.
    pub metrics: SourceMetrics,
}
