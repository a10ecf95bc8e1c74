/// Password hashing with Argon2id
///
/// Stored hashes are PHC strings (`$argon2id$v=19$m=65536,t=3,p=4$salt$hash`),
/// so the parameters travel with every hash and verification never needs
/// configuration. The plaintext is never stored or logged.
///
/// # Parameters
///
/// - **Memory**: 64 MB (65536 KiB)
/// - **Iterations**: 3
/// - **Parallelism**: 4 lanes
/// - **Salt**: 16 random bytes per hash
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Correct-Horse-1")?;
/// assert!(verify_password("Correct-Horse-1", &hash)?);
/// assert!(!verify_password("correct-horse-1", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};

/// Minimum accepted password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn argon2_params() -> Result<Params, PasswordError> {
    ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))
}

/// Well-formed hash with the production parameters that no password matches
///
/// Verified against when a login names an unknown account, so both failure
/// paths pay for one full Argon2id computation.
pub const UNMATCHABLE_HASH: &str =
    "$argon2id$v=19$m=65536,t=3,p=4$dGFza2xhbmUtbm8tdXNlcg$AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8";

/// Hashes `password` with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params()?);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))
}

/// Checks `password` against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch. Errors only when the stored hash itself is
/// unusable, which callers should treat as an internal failure rather than a
/// wrong password.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    if parsed_hash.hash.is_none() {
        return Err(PasswordError::InvalidHash("Missing hash output".to_string()));
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Signup password policy
///
/// At least [`MIN_PASSWORD_LENGTH`] characters with an uppercase letter, a
/// lowercase letter, a digit and a non-alphanumeric character.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    let rules: [(fn(&char) -> bool, &str); 4] = [
        (|c| c.is_uppercase(), "uppercase letter"),
        (|c| c.is_lowercase(), "lowercase letter"),
        (|c| c.is_numeric(), "digit"),
        (|c| !c.is_alphanumeric(), "special character"),
    ];

    for (check, what) in rules {
        if !password.chars().any(|c| check(&c)) {
            return Err(format!("Password must contain at least one {}", what));
        }
    }

    Ok(())
}
