//! File-name glob matching
//!
//! Patterns are matched against base names only, ignoring case.

use glob::{MatchOptions, Pattern};

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Check that a pattern is a valid glob
///
/// # Errors
///
/// Returns the glob parser's message.
pub fn validate(pattern: &str) -> std::result::Result<(), String> {
    Pattern::new(pattern).map(|_| ()).map_err(|e| e.msg.to_string())
}

/// Whether a file name matches a pattern; invalid patterns match nothing
#[must_use]
pub fn matches_file_name(pattern: &str, file_name: &str) -> bool {
    Pattern::new(pattern).is_ok_and(|p| p.matches_with(file_name, OPTIONS))
}

/// Whether two patterns could claim the same file name.
///
/// Detects equal patterns and patterns where one accepts the other's
/// literal text (`*.csv` vs `orders.csv`). Disjoint wildcards that still
/// overlap (`a*` vs `*b`) are caught at extraction time instead.
#[must_use]
pub fn may_overlap(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || matches_file_name(a, b) || matches_file_name(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        assert!(matches_file_name("clients*.csv", "CLIENTS_2024.CSV"));
        assert!(matches_file_name("*.xlsx", "report.xlsx"));
        assert!(!matches_file_name("clients*.csv", "products.csv"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(validate("[abc").is_err());
        assert!(!matches_file_name("[abc", "a"));
        assert!(validate("orders_*.csv").is_ok());
    }

    #[test]
    fn test_overlap_detection() {
        assert!(may_overlap("*.csv", "orders.csv"));
        assert!(may_overlap("Orders.csv", "orders.CSV"));
        assert!(!may_overlap("orders*.csv", "clients*.csv"));
    }
}
