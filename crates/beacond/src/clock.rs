//! Wall-clock helpers shared by audit entries and notifications.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current UTC time rendered as RFC 3339.
///
/// Falls back to Unix seconds if the instant cannot be formatted, which only
/// happens for years outside the four-digit range.
pub(crate) fn utc_timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_parses_as_rfc3339() {
        let stamp = utc_timestamp();
        assert!(stamp.ends_with('Z'), "expected UTC suffix in {stamp}");
        assert!(stamp.contains('T'));
    }
}
