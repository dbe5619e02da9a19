//! Default header construction.
//!
//! Outgoing requests carry a small browser-like header set; per-call
//! headers override same-named defaults.

/// Accept header sent with every request.
const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Build the default header set for an outgoing request.
pub fn default_headers(user_agent: &str, referer: Option<&str>) -> Vec<(String, String)> {
    let mut headers = vec![
        ("User-Agent".to_string(), user_agent.to_string()),
        ("Connection".to_string(), "keep-alive".to_string()),
        ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
        ("Accept".to_string(), DEFAULT_ACCEPT.to_string()),
    ];

    if let Some(referer) = referer {
        headers.push(("Referer".to_string(), referer.to_string()));
    }

    headers
}

/// Merge caller headers over defaults, overriding by case-insensitive name.
pub fn merge(defaults: Vec<(String, String)>, overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = defaults
        .into_iter()
        .filter(|(name, _)| !overrides.iter().any(|(o, _)| o.eq_ignore_ascii_case(name)))
        .collect();
    merged.extend(overrides.iter().cloned());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_default_headers() {
        let headers = default_headers("agent/1.0", None);
        assert_eq!(lookup(&headers, "user-agent"), Some("agent/1.0"));
        assert_eq!(lookup(&headers, "connection"), Some("keep-alive"));
        assert_eq!(lookup(&headers, "accept-language"), Some("en-US,en;q=0.5"));
        assert!(lookup(&headers, "referer").is_none());
    }

    #[test]
    fn test_referer_included_when_set() {
        let headers = default_headers("agent/1.0", Some("https://example.com"));
        assert_eq!(lookup(&headers, "referer"), Some("https://example.com"));
    }

    #[test]
    fn test_merge_overrides_by_name() {
        let defaults = default_headers("agent/1.0", None);
        let merged = merge(defaults, &[("user-agent".to_string(), "other/2.0".to_string())]);

        assert_eq!(lookup(&merged, "User-Agent"), Some("other/2.0"));
        assert_eq!(merged.iter().filter(|(n, _)| n.eq_ignore_ascii_case("user-agent")).count(), 1);
        assert_eq!(lookup(&merged, "accept"), Some(super::DEFAULT_ACCEPT));
    }
}
