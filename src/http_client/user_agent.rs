//! User agent sent with every tracker request.

/// Desktop Chrome user agent. Trackers commonly reject anything that does
/// not look like a browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The configured override, or [`USER_AGENT`] when unset or blank.
pub fn resolve_user_agent(override_ua: Option<&str>) -> String {
    override_ua
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .unwrap_or(USER_AGENT)
        .to_string()
}
