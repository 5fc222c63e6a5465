use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use tracing::{debug, warn};

use crate::models::{NewUser, UserRow};
use crate::{Database, DbError, Result};

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Hash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// True when `password` matches the stored PHC string. A malformed stored
/// hash counts as a mismatch.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Unparseable password hash in users table: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Build a new account with a hashed password. Nothing is written: the
/// caller persists the result with `Database::insert_user`, which is where
/// duplicate usernames or emails are reported.
pub fn signup(
    username: &str,
    email: &str,
    password: &str,
    image_url: Option<&str>,
) -> Result<NewUser> {
    Ok(NewUser {
        id: None,
        username: username.to_string(),
        email: email.to_string(),
        password: hash_password(password)?,
        image_url: image_url.map(str::to_string),
    })
}

impl Database {
    /// Look up `username` and check `password` against its hash.
    ///
    /// Unknown users and wrong passwords both yield `Ok(None)`; only storage
    /// failures are errors.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserRow>> {
        let Some(user) = self.get_user_by_username(username)? else {
            debug!("Login attempt for unknown user '{}'", username);
            return Ok(None);
        };

        if verify_password(&user.password, password) {
            Ok(Some(user))
        } else {
            debug!("Password mismatch for user '{}'", username);
            Ok(None)
        }
    }
}
