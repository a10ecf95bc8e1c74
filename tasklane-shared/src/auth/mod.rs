/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the signup password policy
/// - [`jwt`]: HS256 session tokens
/// - [`middleware`]: resolving a request's token to an [`middleware::AuthContext`]
/// - [`authorization`]: project role resolution and permission checks
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::password::{hash_password, verify_password};
/// use tasklane_shared::auth::jwt::{create_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Us3r-password")?;
/// assert!(verify_password("Us3r-password", &hash)?);
///
/// let token = create_token(&Claims::new(Uuid::new_v4()), "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
