use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

pub fn is_ascii_no_spaces(username: &str) -> Result<(), String> {
    match username.chars().all(|c| c.is_ascii() && !c.is_whitespace()) {
        true => Ok(()),
        false => Err("should be an ascii string without spaces".to_string()),
    }
}

pub fn is_valid_email(string: &str) -> Result<(), String> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[a-z0-9!#$%&'*+/=?^_`{|}~.-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)+$")
            .expect("email pattern is valid")
    });
    match RE.is_match(&string.to_ascii_lowercase()) {
        true => Ok(()),
        false => Err("invalid email".to_string()),
    }
}

/// An empty string is allowed (the field is optional); anything else must be
/// an absolute http(s) URL.
pub fn is_optional_http_url(string: &str) -> Result<(), String> {
    if string.trim().is_empty() {
        return Ok(());
    }
    match Url::parse(string.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(format!("`{string}` is not a valid http(s) URL")),
    }
}

/// Trims `string` and checks that it is between 1 and `max` characters long.
pub fn required_text(
    field: &str,
    string: &str,
    max: usize,
) -> Result<String, String> {
    let trimmed = string.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        Err(format!("{field} must not be empty"))
    } else if len > max {
        Err(format!("{field} must be at most {max} characters"))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("hello@example.com").is_ok());
        assert!(is_valid_email("Judge.One@Example.org").is_ok());
        assert!(is_valid_email("no-at-sign").is_err());
        assert!(is_valid_email("trailing@").is_err());
    }

    #[test]
    fn urls_are_optional_but_must_be_http() {
        assert!(is_optional_http_url("").is_ok());
        assert!(is_optional_http_url("https://example.com/team.png").is_ok());
        assert!(is_optional_http_url("javascript:alert(1)").is_err());
        assert!(is_optional_http_url("not a url").is_err());
    }

    #[test]
    fn required_text_trims_and_bounds_length() {
        assert_eq!(required_text("Title", "  Demo  ", 8), Ok("Demo".into()));
        assert!(required_text("Title", "   ", 8).is_err());
        assert!(required_text("Title", "far too long", 4).is_err());
    }
}
