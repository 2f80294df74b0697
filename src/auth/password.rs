//! Registration password hashing
//!
//! The plain password never leaves the gateway. The identity service stores
//! the argon2id PHC string and checks logins against it itself.

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;

use crate::types::GatewayError;

/// Salt and hash `password`, returning the PHC string sent to the identity
/// service as `hashedPassword`
pub fn hash_password(password: &str) -> Result<String, GatewayError> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| GatewayError::Auth(format!("could not hash password: {e}")))?;
    Ok(phc.to_string())
}
