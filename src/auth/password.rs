use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash password using argon2 with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify password against a stored PHC string. A malformed hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Runs the hasher on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, String> {
    tokio::task::spawn_blocking(move || hash_password(&password).map_err(|e| e.to_string()))
        .await
        .map_err(|e| e.to_string())?
}

pub async fn verify_password_blocking(password: String, stored_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("s3nha-forte").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3nha-forte", &hash));
        assert!(!verify_password("outra-senha", &hash));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("mesma").unwrap();
        let b = hash_password("mesma").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_rejected() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
