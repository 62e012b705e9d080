/// Authentication and authorization primitives
///
/// - [`password`]: Argon2id hashing for the credential store
/// - [`token`]: signed bearer tokens carrying the account identifier
/// - [`gate`]: capability checks and the axum middleware that enforces them
///
/// Verification is constant-time throughout; each stored credential carries
/// its own random salt.

pub mod gate;
pub mod password;
pub mod token;
