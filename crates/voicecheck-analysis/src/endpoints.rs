//! Proxy endpoint candidate resolution.

use url::{Host, Url};
use voicecheck_types::AnalysisConfig;

use crate::types::EndpointCandidate;

/// Path every proxy candidate is normalized to end with.
pub const ANALYZE_SUFFIX: &str = "/analyze";

/// Host machine address as seen from the Android emulator.
pub const EMULATOR_HOST: &str = "10.0.2.2";

/// Loopback address of the local machine.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Seed used when neither a primary nor an alternate proxy is configured.
pub const DEFAULT_PROXY_URL: &str = "http://10.0.2.2:3000/analyze";

/// Build the ordered, duplicate-free list of proxy URLs to try.
///
/// Never returns an empty list. Malformed URLs are passed through as-is.
pub fn resolve(config: &AnalysisConfig) -> Vec<EndpointCandidate> {
    let mut candidates = Vec::new();

    let primary = config.proxy_url.trim();
    if !primary.is_empty() {
        push_unique(&mut candidates, normalize(primary), true, false);
    }

    for alternate in split_alternates(&config.proxy_alternates) {
        push_unique(&mut candidates, normalize(alternate), false, false);
    }

    if candidates.is_empty() {
        push_unique(&mut candidates, DEFAULT_PROXY_URL.to_string(), false, false);
    }

    let first = candidates[0].url.clone();
    for sibling in loopback_siblings(&first) {
        push_unique(&mut candidates, sibling, false, true);
    }

    tracing::debug!(
        candidates = ?candidates.iter().map(|c| c.url.as_str()).collect::<Vec<_>>(),
        "Resolved proxy candidates"
    );
    candidates
}

/// Ensure a base URL ends with [`ANALYZE_SUFFIX`].
///
/// Parseable URLs come back in their canonical form (lowercase host, default
/// port dropped) so equal endpoints compare equal.
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let with_suffix = if trimmed.ends_with(ANALYZE_SUFFIX) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{ANALYZE_SUFFIX}")
    };
    match Url::parse(&with_suffix) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => with_suffix,
    }
}

/// Split an alternates list on commas, semicolons and whitespace.
pub fn split_alternates(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Swap the emulator alias and the loopback address, keeping scheme, port and path.
pub fn loopback_siblings(url: &str) -> Vec<String> {
    let Ok(parsed) = Url::parse(url) else {
        return Vec::new();
    };

    let replacement = match parsed.host() {
        Some(Host::Ipv4(ip)) if ip.to_string() == EMULATOR_HOST => LOOPBACK_HOST,
        Some(Host::Ipv4(ip)) if ip.is_loopback() => EMULATOR_HOST,
        Some(Host::Domain("localhost")) => EMULATOR_HOST,
        _ => return Vec::new(),
    };

    let mut sibling = parsed;
    if sibling.set_host(Some(replacement)).is_err() {
        return Vec::new();
    }
    vec![sibling.to_string()]
}

fn push_unique(list: &mut Vec<EndpointCandidate>, url: String, is_primary: bool, is_derived: bool) {
    if list.iter().any(|c| c.url == url) {
        return;
    }
    list.push(EndpointCandidate {
        url,
        is_primary,
        is_derived,
    });
}
