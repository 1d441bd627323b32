//! Device detection from `User-Agent` headers
//!
//! Good enough to tell a user's sessions apart; ordered rule tables, first
//! match wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::DeviceInfo;

const UNKNOWN: &str = "Unknown";

static BROWSERS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Edg(e|A|iOS)?/([\d.]+)", "Edge"),
        (r"(OPR|Opera)/([\d.]+)", "Opera"),
        (r"YaBrowser/([\d.]+)", "Yandex Browser"),
        (r"SamsungBrowser/([\d.]+)", "Samsung Internet"),
        (r"(Firefox|FxiOS)/([\d.]+)", "Firefox"),
        (r"(Chrome|CriOS)/([\d.]+)", "Chrome"),
        (r"Version/([\d.]+).*Safari/", "Safari"),
        (r"(curl|Wget)/", "CLI"),
        (r"(PostmanRuntime|insomnia)/", "API client"),
    ]
    .into_iter()
    .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|re| (re, name)))
    .collect()
});

static SYSTEMS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Windows NT", "Windows"),
        (r"(iPhone|iPad|iPod)", "iOS"),
        (r"Android", "Android"),
        (r"CrOS", "ChromeOS"),
        (r"Mac OS X|Macintosh", "macOS"),
        (r"Linux", "Linux"),
    ]
    .into_iter()
    .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|re| (re, name)))
    .collect()
});

static TABLET: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"iPad|Tablet").ok());
static MOBILE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"Mobile|iPhone|iPod|Android").ok());
static BOT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)bot|crawler|spider").ok());

/// Parse a `User-Agent` header into device details
pub fn parse_user_agent(user_agent: Option<&str>) -> DeviceInfo {
    let ua = user_agent.map(str::trim).unwrap_or_default();
    if ua.is_empty() {
        return DeviceInfo {
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
            device_type: UNKNOWN.to_lowercase(),
            user_agent: String::new(),
        };
    }

    let browser = first_match(&BROWSERS, ua);
    let os = first_match(&SYSTEMS, ua);
    let device_type = if matches(&BOT, ua) {
        "bot"
    } else if matches(&TABLET, ua) || (ua.contains("Android") && !ua.contains("Mobile")) {
        "tablet"
    } else if matches(&MOBILE, ua) {
        "smartphone"
    } else if os == UNKNOWN {
        "unknown"
    } else {
        "desktop"
    };

    DeviceInfo {
        browser: browser.to_string(),
        os: os.to_string(),
        device_type: device_type.to_string(),
        user_agent: ua.to_string(),
    }
}

fn first_match(rules: &[(Regex, &'static str)], ua: &str) -> &'static str {
    rules
        .iter()
        .find(|(re, _)| re.is_match(ua))
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN)
}

fn matches(re: &Lazy<Option<Regex>>, ua: &str) -> bool {
    re.iter().any(|re| re.is_match(ua))
}
