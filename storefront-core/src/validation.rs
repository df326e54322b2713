use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Input validation shared by the user and product services.
///
/// Email validation regex, a practical subset of RFC 5322.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

static IMAGE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("Invalid image URL regex pattern")
});

pub const USERNAME_MIN_LEN: usize = 2;
pub const USERNAME_MAX_LEN: usize = 20;

/// Validates an email address
///
/// # Examples
///
/// ```rust
/// use storefront_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(format!(
            "Invalid email format: {email}"
        )))
    }
}

/// Validates a password according to security requirements
///
/// # Password Requirements
///
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - Cannot be empty or whitespace only
///
/// # Examples
///
/// ```rust
/// use storefront_core::validation::validate_password;
///
/// assert!(validate_password("securepassword123").is_ok());
/// assert!(validate_password("weak").is_err());
/// ```
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    if password.trim().is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password cannot be only whitespace".to_string(),
        ));
    }

    if password.len() < 8 {
        return Err(ValidationError::InvalidPassword(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(ValidationError::InvalidPassword(
            "Password must be no more than 128 characters long".to_string(),
        ));
    }

    Ok(())
}

/// Validates a login name
///
/// Usernames are between 2 and 20 characters and may not contain whitespace.
/// They are also used to build limiter keys and URL paths.
///
/// ```rust
/// use storefront_core::validation::validate_username;
///
/// assert!(validate_username("alice").is_ok());
/// assert!(validate_username("a").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::MissingField(
            "Username is required".to_string(),
        ));
    }

    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::InvalidUsername(format!(
            "Username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters long"
        )));
    }

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUsername(
            "Username cannot contain whitespace".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField(
            "Product name is required".to_string(),
        ));
    }

    if name.len() > 200 {
        return Err(ValidationError::InvalidField(
            "Product name must be no more than 200 characters long".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::InvalidField(
            "Price must be a non-negative number".to_string(),
        ));
    }

    Ok(())
}

/// Product images are referenced by absolute http(s) URL.
pub fn validate_image_url(image: &str) -> Result<(), ValidationError> {
    if image.is_empty() {
        return Err(ValidationError::MissingField(
            "Image is required".to_string(),
        ));
    }

    if IMAGE_URL_REGEX.is_match(image) {
        Ok(())
    } else {
        Err(ValidationError::InvalidField(format!(
            "Image must be an http(s) URL: {image}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("test.email+tag@domain.co.uk").is_ok());
        assert!(validate_email("user123@test-domain.com").is_ok());
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(validate_email("").is_err());
        assert!(validate_email("invalid-email").is_err());
        assert!(validate_email("@domain.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());

        let long_email = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long_email).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("12345678").is_ok());

        assert!(matches!(
            validate_password(""),
            Err(ValidationError::MissingField(_))
        ));
        assert!(validate_password("   ").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("al").is_ok());
        assert!(validate_username("alice_smith").is_ok());
        assert!(validate_username(&"a".repeat(20)).is_ok());

        assert!(matches!(
            validate_username(""),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            validate_username("a"),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(validate_username(&"a".repeat(21)).is_err());
        assert!(validate_username("alice smith").is_err());
    }

    #[test]
    fn test_validate_product_fields() {
        assert!(validate_product_name("Coffee mug").is_ok());
        assert!(validate_product_name("  ").is_err());

        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(19.99).is_ok());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_image_url() {
        assert!(validate_image_url("https://cdn.example.com/mug.png").is_ok());
        assert!(validate_image_url("http://example.com/a.jpg").is_ok());

        assert!(validate_image_url("").is_err());
        assert!(validate_image_url("ftp://example.com/a.jpg").is_err());
        assert!(validate_image_url("mug.png").is_err());
        assert!(validate_image_url("https://exa mple.com").is_err());
    }
}
