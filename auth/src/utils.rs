//! Utility functions for partner authentication.

/// Device descriptor stored with a session: the `User-Agent`, trimmed and
/// cut to at most `max_len` characters.
///
/// # Examples
///
/// ```
/// use checkin_auth::utils::device_descriptor;
///
/// assert_eq!(device_descriptor(Some("  Mozilla/5.0 "), 512).as_deref(), Some("Mozilla/5.0"));
/// assert_eq!(device_descriptor(Some("abcdef"), 3).as_deref(), Some("abc"));
/// assert_eq!(device_descriptor(Some("   "), 512), None);
/// assert_eq!(device_descriptor(None, 512), None);
/// ```
#[must_use]
pub fn device_descriptor(user_agent: Option<&str>, max_len: usize) -> Option<String> {
    let trimmed = user_agent?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_len).collect())
}

/// Validate email address format.
///
/// This performs basic validation:
/// - Must contain exactly one `@`
/// - Must have non-empty local and domain parts
/// - Domain must contain a dot
/// - Length must be between 3 and 255 characters
///
/// The identity provider is the authority on credentials; this only spares
/// it obviously malformed requests.
///
/// # Examples
///
/// ```
/// use checkin_auth::utils::is_valid_email;
///
/// assert!(is_valid_email("staff@climbing-gym.example"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_descriptor_respects_char_boundaries() {
        let ua = "é".repeat(10);
        assert_eq!(device_descriptor(Some(&ua), 4), Some("éééé".to_string()));
    }

    #[test]
    fn test_email_edge_cases() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.example.com"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a@b@c.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@co."));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(250))));
    }
}
