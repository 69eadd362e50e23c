//! Password hashing, session tokens and role capabilities.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::models::Role;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hashes a password with Argon2id and a random salt (PHC string format).
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    if plain.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Generic(format!("password hashing failed: {}", e)))
}

/// Verifies a password against a stored PHC hash. Malformed hashes never verify.
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generates a new random session token (256 bits, hex encoded).
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest under which a session token is stored. The raw token only lives in the cookie.
pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl Role {
    /// Admin pages and admin API routes.
    pub fn can_access_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// Roles that may create and submit fund requests.
    pub fn can_submit_requests(&self) -> bool {
        matches!(self, Role::Teacher | Role::Staff | Role::DeptHead)
    }

    /// Account management is reserved for superadmins.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    /// Department-stage reviewer.
    pub fn is_dept_head(&self) -> bool {
        matches!(self, Role::DeptHead)
    }

    /// Path of the landing dashboard for this role.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Admin | Role::SuperAdmin => "/admin",
            Role::Teacher | Role::Staff | Role::DeptHead => "/dashboard",
        }
    }
}
