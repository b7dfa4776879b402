//! Argon2id password hashing and the password policy applied at registration.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Shortest accepted password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest accepted password; bounds hashing cost for hostile input.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash with a fresh random salt, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Passwords need 8-128 characters with at least one letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must not exceed {MAX_PASSWORD_LENGTH} characters"
        ));
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err("Password must contain both letters and digits".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("studio-booking-42").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("studio-booking-42", &hash).unwrap());
        assert!(!verify_password("studio-booking-43", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        let msg = validate_password_strength("ab1").unwrap_err();
        assert!(msg.contains("at least 8"));
    }

    #[test]
    fn letters_and_digits_are_required() {
        assert!(validate_password_strength("onlyletters").is_err());
        assert!(validate_password_strength("1234567890").is_err());
        assert!(validate_password_strength("letters4ever").is_ok());
    }

    #[test]
    fn overlong_password_is_rejected() {
        let long = format!("a1{}", "x".repeat(MAX_PASSWORD_LENGTH));
        assert!(validate_password_strength(&long).is_err());
    }
}
