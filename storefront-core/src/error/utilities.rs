use crate::error::ValidationError;

/// Extension trait for Option types to simplify required field validation
///
/// Converts a missing value into [`ValidationError::MissingField`], which keeps
/// the builders in this crate free of repeated `ok_or` boilerplate.
///
/// # Example
///
/// ```rust
/// use storefront_core::error::utilities::RequiredFieldExt;
///
/// let username: Option<String> = Some("alice".to_string());
/// let username = username.require_field("Username").unwrap();
/// assert_eq!(username, "alice");
/// ```
pub trait RequiredFieldExt<T> {
    /// Convert None to a ValidationError::MissingField
    fn require_field(self, field_name: &str) -> Result<T, ValidationError>;
}

impl<T> RequiredFieldExt<T> for Option<T> {
    fn require_field(self, field_name: &str) -> Result<T, ValidationError> {
        self.ok_or_else(|| ValidationError::MissingField(format!("{field_name} is required")))
    }
}
