pub mod auth;
pub mod google;
pub mod identity;
pub mod security;
pub mod sessions;
pub mod tokens;

pub use auth::AuthService;
pub use google::{GoogleIdentityVerifier, GoogleTokenVerifier};
pub use identity::{IdentityReconciler, Reconciled};
pub use sessions::SessionLedger;
pub use tokens::TokenCodec;

/// Name recorded on every domain event this crate emits.
pub const SERVICE_NAME: &str = "auth-service";
