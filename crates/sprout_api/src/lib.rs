//! # SPROUT API
//!
//! The application-facing facade over the progression engines: one service
//! type with one method per operation the UI calls, each returning a
//! structured envelope instead of propagating errors.
//!
//! ## Design Principles
//!
//! 1. **Envelopes, not exceptions** - every operation catches its own
//!    failures and degrades to `{ success: false, message }`
//! 2. **Role gating** - teacher operations deny with a generic message
//! 3. **Per-user serialization** - mutations for one user never interleave,
//!    closing the lost-update race the store itself does not prevent
//! 4. **Fresh settings** - re-read from the store at the start of every
//!    operation

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod envelope;
pub mod error;
pub mod payload;
pub mod service;

pub use envelope::ApiEnvelope;
pub use error::{ApiError, ApiResult};
pub use payload::{
    ActivityEntry, BadgeView, DrawView, GachaView, GameData, GrantReport, GrantRequest,
    ProfileView, RankingEntry, StudentDetails, StudentSummary, TeacherData,
};
pub use service::GameService;
