//! Request parameter extraction and syntax checks (RFC 6749 Appendix A, RFC 7636 section 4).

use std::collections::HashMap;

use crate::error::OAuthError;

pub type Params = HashMap<String, String>;

/// Fetch a required parameter.
pub fn required<'a>(params: &'a Params, name: &str) -> Result<&'a str, OAuthError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| OAuthError::missing_parameter(name))
}

pub fn optional<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str)
}

/// VSCHAR = %x20-7E
fn is_vschar(c: char) -> bool {
    ('\x20'..='\x7e').contains(&c)
}

/// NQCHAR = %x21 / %x23-5B / %x5D-7E
fn is_nqchar(c: char) -> bool {
    c == '\x21' || ('\x23'..='\x5b').contains(&c) || ('\x5d'..='\x7e').contains(&c)
}

/// unreserved = ALPHA / DIGIT / "-" / "." / "_" / "~"
fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

fn invalid(name: &str) -> OAuthError {
    OAuthError::invalid_request(format!("invalid \"{}\"", name))
}

/// One or more VSCHAR (`client_id`, `state`).
pub fn check_vschar(name: &str, value: &str) -> Result<(), OAuthError> {
    if value.is_empty() || !value.chars().all(is_vschar) {
        return Err(invalid(name));
    }
    Ok(())
}

/// `scope-token *( SP scope-token )`, each token one or more NQCHAR.
pub fn check_scope(value: &str) -> Result<(), OAuthError> {
    let valid = !value.is_empty()
        && value
            .split(' ')
            .all(|token| !token.is_empty() && token.chars().all(is_nqchar));
    if !valid {
        return Err(invalid("scope"));
    }
    Ok(())
}

/// `code_challenge` and `code_verifier`: 43 to 128 unreserved characters.
pub fn check_pkce_value(name: &str, value: &str) -> Result<(), OAuthError> {
    if !(43..=128).contains(&value.len()) || !value.chars().all(is_unreserved) {
        return Err(invalid(name));
    }
    Ok(())
}
