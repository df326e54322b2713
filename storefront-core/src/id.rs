//! ID generation utilities with prefix support
//!
//! IDs look like `{prefix}_{random}` where the random part carries 96 bits of
//! entropy, base64 URL-safe encoded without padding.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::RngCore;

/// Generate a prefixed ID with 96 bits of entropy
///
/// # Example
/// ```
/// use storefront_core::id::generate_prefixed_id;
///
/// let product_id = generate_prefixed_id("prd");
/// assert!(product_id.starts_with("prd_"));
/// ```
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);

    let encoded = BASE64_URL_SAFE_NO_PAD.encode(bytes);

    format!("{prefix}_{encoded}")
}

/// Validate that a prefixed ID has the expected format
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= 12,
        Err(_) => false,
    }
}

/// Declares an opaque string identifier with a fixed prefix.
///
/// The generated type serializes as a bare string and exposes the same small
/// API for every entity: `new`, `new_random`, `as_str`, `into_inner` and
/// `is_valid`.
macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new(id: &str) -> Self {
                Self(id.to_string())
            }

            pub fn new_random() -> Self {
                Self($crate::id::generate_prefixed_id($prefix))
            }

            pub fn into_inner(self) -> String {
                self.0
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Validate that this ID carries the expected prefix and entropy
            pub fn is_valid(&self) -> bool {
                $crate::id::validate_prefixed_id(&self.0, $prefix)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new_random()
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use prefixed_id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id("usr");
        assert!(id.starts_with("usr_"));

        let id2 = generate_prefixed_id("usr");
        assert_ne!(id, id2);
    }

    #[test]
    fn test_validate_prefixed_id() {
        let id = generate_prefixed_id("ord");
        assert!(validate_prefixed_id(&id, "ord"));
        assert!(!validate_prefixed_id(&id, "prd"));

        assert!(!validate_prefixed_id("ord", "ord"));
        assert!(!validate_prefixed_id("ord_", "ord"));
        assert!(!validate_prefixed_id("ord_invalid!", "ord"));
    }

    #[test]
    fn test_id_is_url_safe() {
        let id = generate_prefixed_id("prd");
        assert!(
            id.chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        );
    }
}
