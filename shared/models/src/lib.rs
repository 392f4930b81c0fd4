//! Shared domain types for the Tally users service.
//!
//! - `auth`: users, token claims and the request/response payloads of the
//!   auth API
//! - `settings`: the closed value sets stored in a user's settings
//! - `error`: the categorised application error every layer returns

pub mod auth;
pub mod error;
pub mod settings;

pub use error::{AppError, AppResult, ErrorKind};
pub use settings::{Currency, UserSettings, Weekday, WeekdayPolicy};
