//! Cookie string handling
//!
//! The caller hands over the `Cookie` header copied from a logged-in browser.
//! Challenge solving returns a fresh jar; it is merged back so cookies the
//! browser did not touch survive.

use std::collections::BTreeMap;

/// Cookie name to value mapping, ordered for stable header output
pub type CookieJar = BTreeMap<String, String>;

/// Cookie Clerk uses to carry the current session JWT
pub const SESSION_JWT_COOKIE: &str = "__session";

/// Parse a `name=value; name2=value2` header. Values may contain `=`;
/// fragments without a name are skipped.
pub fn parse_cookie_string(raw: &str) -> CookieJar {
    raw.split(';')
        .filter_map(|item| {
            let (name, value) = item.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Render a jar as a `Cookie` header value
pub fn to_cookie_string(jar: &CookieJar) -> String {
    jar.iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Overlay `refreshed` on top of the cookies in `raw`
pub fn merge_cookie_string(raw: &str, refreshed: &CookieJar) -> String {
    let mut jar = parse_cookie_string(raw);
    jar.extend(refreshed.iter().map(|(k, v)| (k.clone(), v.clone())));
    to_cookie_string(&jar)
}
