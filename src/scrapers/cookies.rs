//! Cookie header merging.
//!
//! Trackers rotate session cookies through `Set-Cookie` and the challenge
//! solver hands back the cookies its browser collected. Both are folded into
//! the stored `Cookie` header value here so the next request carries them.

/// Parse a `Cookie` header value into ordered `(name, value)` pairs.
///
/// Segments without `=` or with an empty name are skipped. A later
/// duplicate name overwrites the earlier value but keeps its position.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    let mut cookies: Vec<(String, String)> = Vec::new();
    for segment in header.split(';') {
        let Some((name, value)) = segment.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        set_cookie(&mut cookies, name, strip_quotes(value.trim()));
    }
    cookies
}

/// Extract the `(name, value)` of a single `Set-Cookie` header value,
/// ignoring attributes such as `Path`, `Domain`, `Expires` and flags.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let first = header.split(';').next()?;
    let (name, value) = first.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), strip_quotes(value.trim()).to_string()))
}

/// Merge raw `Set-Cookie` header values into an existing cookie header.
pub fn merge_set_cookie_headers<S: AsRef<str>>(existing: &str, set_cookies: &[S]) -> String {
    let pairs: Vec<(String, String)> = set_cookies
        .iter()
        .filter_map(|header| parse_set_cookie(header.as_ref()))
        .collect();
    merge_cookie_pairs(existing, &pairs)
}

/// Merge `(name, value)` assignments into an existing cookie header.
///
/// Existing names are overwritten in place, new names are appended.
/// Returns the input unchanged when there is nothing to merge.
pub fn merge_cookie_pairs<N, V>(existing: &str, assignments: &[(N, V)]) -> String
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    if assignments.is_empty() {
        return existing.to_string();
    }

    let mut cookies = parse_cookie_header(existing);
    for (name, value) in assignments {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        set_cookie(&mut cookies, name, value.as_ref());
    }

    serialize(&cookies)
}

fn set_cookie(cookies: &mut Vec<(String, String)>, name: &str, value: &str) {
    match cookies.iter_mut().find(|(existing, _)| existing == name) {
        Some(entry) => entry.1 = value.to_string(),
        None => cookies.push((name.to_string(), value.to_string())),
    }
}

fn serialize(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
