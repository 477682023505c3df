//! Vendor CLI output parsers.
//!
//! Every parser is pure and total: malformed or unrecognised input yields an
//! empty or partial list, never an error. Tables are read with a two-state
//! scanner (seeking the vendor's header line, then reading data rows) and
//! each row is mapped positionally into a record.

mod arista;
mod catalog;
mod cisco;
mod h3c;
mod huawei;
mod juniper;

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::*;

pub use arista::AristaParser;
pub use catalog::CommandCatalog;
pub use cisco::CiscoParser;
pub use h3c::H3cParser;
pub use huawei::HuaweiParser;
pub use juniper::JuniperParser;

/// Capability set every vendor dialect implements
pub trait VendorParser: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// The command this dialect uses for an operation
    fn default_command(&self, op: Operation) -> &'static str;

    fn parse_neighbors(&self, raw: &str) -> Vec<NeighborRecord>;

    fn parse_routing_peers(&self, raw: &str) -> Vec<RoutingPeerRecord>;

    fn parse_interfaces(&self, raw: &str) -> Vec<InterfaceRecord>;

    fn parse_system_info(&self, raw: &str) -> SystemInfo;
}

/// ParserRegistry maps vendor tags to parsers. Built once at startup and
/// shared with the collector.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<Vendor, Arc<dyn VendorParser>>,
    fallback: Arc<dyn VendorParser>,
}

impl ParserRegistry {
    /// Registry with no vendor variants, only the given fallback
    pub fn new(fallback: Arc<dyn VendorParser>) -> Self {
        Self {
            parsers: HashMap::new(),
            fallback,
        }
    }

    /// Registry with every built-in dialect. Cisco IOS-style output is the
    /// fallback for unknown vendors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new(Arc::new(CiscoParser));
        registry.register(Arc::new(CiscoParser));
        registry.register(Arc::new(HuaweiParser));
        registry.register(Arc::new(H3cParser));
        registry.register(Arc::new(JuniperParser));
        registry.register(Arc::new(AristaParser));
        registry
    }

    pub fn register(&mut self, parser: Arc<dyn VendorParser>) {
        self.parsers.insert(parser.vendor(), parser);
    }

    /// Parser for a vendor, or the fallback when none is registered
    pub fn get(&self, vendor: Vendor) -> &dyn VendorParser {
        self.parsers
            .get(&vendor)
            .map(|p| p.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        let mut vendors: Vec<Vendor> = self.parsers.keys().copied().collect();
        vendors.sort_by_key(|v| v.as_str());
        vendors
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ========== Shared helpers ==========

/// Split on runs of two or more whitespace characters. Single spaces stay
/// inside a column ("administratively down", "uplink to core").
pub(crate) fn split_wide(line: &str) -> Vec<&str> {
    let mut cols = Vec::new();
    let bytes = line.as_bytes();
    let mut start: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        let is_ws = bytes[i].is_ascii_whitespace();
        let next_ws = bytes.get(i + 1).map_or(true, |b| b.is_ascii_whitespace());
        match start {
            None if !is_ws => start = Some(i),
            Some(s) if is_ws && (next_ws || bytes[i] == b'\t') => {
                cols.push(&line[s..i]);
                start = None;
            }
            _ => {}
        }
        i += 1;
    }
    if let Some(s) = start {
        cols.push(line[s..].trim_end());
    }
    cols
}

/// Plain whitespace tokenization
pub(crate) fn split_tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// A rule line such as `-----`, `=== ===` or `+---+---+`
pub(crate) fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c == '-' || c == '=')
        && trimmed.chars().all(|c| matches!(c, '-' | '=' | '+' | '*' | ' ' | '\t'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingHeader,
    InData { seen_rows: bool },
}

/// Collect the data rows of every table whose header satisfies `is_header`.
///
/// Separator and blank lines right after a header are skipped; once a data
/// row has been read, the next blank or separator line closes the table and
/// the scanner goes back to seeking a header.
pub(crate) fn table_rows<'a>(raw: &'a str, is_header: impl Fn(&str) -> bool) -> Vec<&'a str> {
    let mut rows = Vec::new();
    let mut state = ScanState::SeekingHeader;

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        match state {
            ScanState::SeekingHeader => {
                if is_header(line) {
                    state = ScanState::InData { seen_rows: false };
                }
            }
            ScanState::InData { seen_rows } => {
                let blank = line.trim().is_empty();
                if blank || is_separator(line) {
                    if seen_rows {
                        state = ScanState::SeekingHeader;
                    }
                    continue;
                }
                if is_header(line) {
                    state = ScanState::InData { seen_rows: false };
                    continue;
                }
                rows.push(line);
                state = ScanState::InData { seen_rows: true };
            }
        }
    }

    rows
}

/// Header match: every token appears in the line, case-insensitively
pub(crate) fn header_has(line: &str, tokens: &[&str]) -> bool {
    let lower = line.to_lowercase();
    tokens.iter().all(|t| lower.contains(&t.to_lowercase()))
}

/// Parse a number, tolerating surrounding noise like `120s` or `(a)`
pub(crate) fn parse_number<T: std::str::FromStr>(s: &str) -> Option<T> {
    let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parse a duration into seconds.
///
/// Accepts `hh:mm:ss`, `mm:ss`, compact forms (`1d02h`, `2w3d`, `5h10m`),
/// prose (`12 weeks, 3 days, 4 hours, 5 minutes`) and bare seconds.
pub(crate) fn parse_duration_secs(s: &str) -> Option<u64> {
    let s = s.trim().trim_end_matches('.');
    if s.is_empty() {
        return None;
    }

    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }

    if s.contains(':') && s.chars().all(|c| c.is_ascii_digit() || c == ':') {
        let parts: Vec<u64> = s.split(':').map(|p| p.parse().ok()).collect::<Option<_>>()?;
        return match parts.as_slice() {
            [h, m, sec] => Some(h * 3600 + m * 60 + sec),
            [m, sec] => Some(m * 60 + sec),
            _ => None,
        };
    }

    let lower = s.to_lowercase();
    let mut total = 0u64;
    let mut matched = false;
    let mut number = String::new();
    let mut chars = lower.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        if c.is_whitespace() || c == ',' {
            continue;
        }
        if !c.is_ascii_alphabetic() {
            number.clear();
            continue;
        }
        let mut unit = String::from(c);
        while let Some(&n) = chars.peek() {
            if n.is_ascii_alphabetic() {
                unit.push(n);
                chars.next();
            } else {
                break;
            }
        }
        if number.is_empty() {
            continue;
        }
        let value: u64 = number.parse().ok()?;
        number.clear();
        let factor = match unit.as_str() {
            "y" | "year" | "years" => 365 * 86_400,
            "w" | "week" | "weeks" => 7 * 86_400,
            "d" | "day" | "days" => 86_400,
            "h" | "hour" | "hours" => 3600,
            "m" | "min" | "mins" | "minute" | "minutes" => 60,
            "s" | "sec" | "secs" | "second" | "seconds" => 1,
            _ => continue,
        };
        total += value * factor;
        matched = true;
    }

    matched.then_some(total)
}

/// First capture group of `pattern` in `text`, trimmed; `None` when the
/// pattern is invalid, absent, or captures an empty string
pub(crate) fn capture(pattern: &str, text: &str) -> Option<String> {
    let re = regex_lite::Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Hostname from a CLI prompt left in the output (`<SW1>`, `[SW1]`, `SW1#`, `user@SW1>`)
pub(crate) fn prompt_hostname(text: &str) -> Option<String> {
    capture(r"(?m)^\s*[<\[]([A-Za-z0-9][\w.\-]*)[>\]]", text)
        .or_else(|| capture(r"(?m)^\s*(?:\w+@)?([A-Za-z0-9][\w.\-]*)[#>]\s*$", text))
}

/// Treat `-`, `--` and `N/A` cells as absent
pub(crate) fn cell(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() || s == "-" || s == "--" || s.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(s.to_string())
    }
}

pub(crate) fn looks_like_ipv4(s: &str) -> bool {
    s.parse::<std::net::Ipv4Addr>().is_ok()
}
