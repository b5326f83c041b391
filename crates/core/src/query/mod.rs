//! Query-string snapshot and the per-field parse rules used by the overlay.
//!
//! Every parser here is total: malformed input degrades to a default rather
//! than producing an error.

use std::collections::HashMap;

use url::{form_urlencoded, Url};

/// Highest score a player can display.
pub const MAX_POINTS: u8 = 3;

/// Snapshot of the query parameters of a location, read fresh for every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery {
    params: HashMap<String, String>,
}

impl RawQuery {
    /// Parses a raw query string (without the leading `?`).
    ///
    /// Repeated keys keep their first value.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = HashMap::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { params }
    }

    pub fn from_url(url: &Url) -> Self {
        Self::parse(url.query().unwrap_or_default())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawQuery
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = HashMap::new();
        for (key, value) in iter {
            params.entry(key.into()).or_insert_with(|| value.into());
        }
        Self { params }
    }
}

/// What a `timer` parameter asks the clock to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Reset,
}

impl TimerAction {
    /// Maps the lexical table `1|true|start` and `0|false|stop|reset`,
    /// ignoring case. Anything else has no effect.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "start" => Some(Self::Start),
            "0" | "false" | "stop" | "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Parses a leading base-10 integer the lenient way: surrounding whitespace
/// is skipped, an optional sign is accepted and parsing stops at the first
/// non-digit. Returns `None` when no digit is found.
pub fn parse_int_prefix(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut seen = false;
    let mut acc: i64 = 0;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        seen = true;
        acc = acc.saturating_mul(10).saturating_add(i64::from(byte - b'0'));
    }

    seen.then_some(if negative { -acc } else { acc })
}

/// Score parameter: integer, 0 on failure, clamped to `[0, MAX_POINTS]`.
pub fn parse_points(value: &str) -> u8 {
    let raw = parse_int_prefix(value).unwrap_or(0);
    raw.clamp(0, i64::from(MAX_POINTS)) as u8
}

/// `visible` parameter: `0`, `false` and `hidden` hide the overlay, every
/// other value shows it.
pub fn parse_visible(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "0" | "false" | "hidden"
    )
}

/// Parses `mm:ss` into whole seconds. Fewer than two parts yields 0, invalid
/// parts count as 0 and the total never goes below zero.
pub fn parse_clock(value: &str) -> u64 {
    let mut parts = value.split(':');
    let (Some(minutes), Some(seconds)) = (parts.next(), parts.next()) else {
        return 0;
    };

    let minutes = parse_int_prefix(minutes).unwrap_or(0);
    let seconds = parse_int_prefix(seconds).unwrap_or(0);
    minutes.saturating_mul(60).saturating_add(seconds).max(0) as u64
}

/// Formats whole seconds as zero-padded `mm:ss`.
pub fn format_clock(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_with_decoding_and_first_value_wins() {
        let query = RawQuery::parse("?player1=Alice+B&player1=Other&cmd1=%2Fwarp%20home");
        assert_eq!(query.get("player1"), Some("Alice B"));
        assert_eq!(query.get("cmd1"), Some("/warp home"));
        assert_eq!(query.get("player2"), None);
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn reads_query_from_url() {
        let url = Url::parse("https://overlay.test/index.html?points1=2#top").unwrap();
        let query = RawQuery::from_url(&url);
        assert_eq!(query.get("points1"), Some("2"));

        let bare = Url::parse("https://overlay.test/").unwrap();
        assert!(RawQuery::from_url(&bare).is_empty());
    }

    #[test]
    fn points_default_and_clamp() {
        assert_eq!(parse_points("2"), 2);
        assert_eq!(parse_points("7"), 3);
        assert_eq!(parse_points("-4"), 0);
        assert_eq!(parse_points("abc"), 0);
        assert_eq!(parse_points(""), 0);
        assert_eq!(parse_points("2.9"), 2);
        assert_eq!(parse_points(" 1x"), 1);
    }

    #[test]
    fn visible_lexical_table() {
        for hidden in ["0", "false", "FALSE", "hidden", "Hidden"] {
            assert!(!parse_visible(hidden), "{hidden} should hide");
        }
        for shown in ["1", "true", "yes", ""] {
            assert!(parse_visible(shown), "{shown} should show");
        }
    }

    #[test]
    fn timer_lexical_table() {
        assert_eq!(TimerAction::parse("START"), Some(TimerAction::Start));
        assert_eq!(TimerAction::parse("1"), Some(TimerAction::Start));
        assert_eq!(TimerAction::parse("True"), Some(TimerAction::Start));
        assert_eq!(TimerAction::parse("stop"), Some(TimerAction::Reset));
        assert_eq!(TimerAction::parse("reset"), Some(TimerAction::Reset));
        assert_eq!(TimerAction::parse("0"), Some(TimerAction::Reset));
        assert_eq!(TimerAction::parse("pause"), None);
    }

    #[test]
    fn clock_parsing() {
        assert_eq!(parse_clock("02:05"), 125);
        assert_eq!(parse_clock("bad"), 0);
        assert_eq!(parse_clock("x:30"), 30);
        assert_eq!(parse_clock("1:"), 60);
        assert_eq!(parse_clock("00:-30"), 0);
        assert_eq!(parse_clock("1:02:03"), 62);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(125), "02:05");
        assert_eq!(format_clock(6_000), "100:00");
    }
}
