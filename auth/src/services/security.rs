//! Password hashing. bcrypt work runs on the blocking thread pool.

use rand::rngs::OsRng;
use rand::Rng;

use tally_models::error::{slugs, AppError, AppResult};

pub const BCRYPT_COST: u32 = 12;

pub const THROWAWAY_PASSWORD_LEN: usize = 20;

const THROWAWAY_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789$#@&^*()";

pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AppError::unknown(format!("Hashing task failed: {e}"), slugs::CREATE_USER_ERROR))?
        .map_err(|e| AppError::unknown(format!("Password hashing failed: {e}"), slugs::CREATE_USER_ERROR))
}

/// False for a mismatch and also for a malformed stored hash.
pub async fn verify_password(password: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Stored password hash could not be checked");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}

/// Random password for accounts that only ever sign in through Google. It is
/// hashed and stored, never shown to anyone.
pub fn generate_throwaway_password() -> String {
    let mut rng = OsRng;
    (0..THROWAWAY_PASSWORD_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..THROWAWAY_CHARSET.len());
            THROWAWAY_CHARSET[idx] as char
        })
        .collect()
}
