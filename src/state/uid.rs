//! Stable user identifiers.
//!
//! A user's id is a UUIDv5 of their case-folded login name, so the same
//! person gets the same id on every connection and across restarts, and
//! ignore relations keep pointing at them.

use uuid::Uuid;

/// Namespace for login-name ids.
const USER_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_0c3e_2d4a_4f7e_9a51_3c8e_d2b7_a410);

/// Longest accepted login name.
pub const MAX_NAME_LEN: usize = 16;

/// Id for the user logging in as `name`.
pub fn user_id(name: &str) -> Uuid {
    Uuid::new_v5(&USER_NAMESPACE, name.to_lowercase().as_bytes())
}

/// Whether `name` is an acceptable login name: 1-16 of `[A-Za-z0-9_]`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
