//! Throughput extraction from measurement tool output.
//!
//! The tool's stdout is a line-oriented text protocol whose only contract
//! is that some lines carry one or more `<number> <unit>/sec` tokens.
//! Periodic report lines can carry both an interval figure and a cumulative
//! figure; the last token on the line wins.

use regex::Regex;
use std::sync::LazyLock;

static THROUGHPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]+ \w+/sec").expect("valid regex"));

/// Extract the throughput token from one output line.
///
/// Returns the last match when several are present, `None` for lines
/// without one (headers, banners, blank lines). A miss is routine, not an
/// error.
pub fn extract_throughput(line: &str) -> Option<&str> {
    THROUGHPUT.find_iter(line).last().map(|m| m.as_str())
}
