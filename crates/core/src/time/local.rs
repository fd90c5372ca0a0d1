use anyhow::{bail, Context};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Parses a fixed UTC offset such as `+05:30`, `-0800` or `Z`.
pub fn parse_utc_offset(s: &str) -> anyhow::Result<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).context("invalid UTC offset");
    }

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => bail!("offset must start with '+' or '-' (got {s:?})"),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().with_context(|| format!("invalid offset hours in {s:?}"))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("invalid offset minutes in {s:?}"))?;
    anyhow::ensure!(
        (0..=14).contains(&hours) && (0..60).contains(&minutes),
        "offset out of range: {s}"
    );

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("invalid UTC offset: {s}"))
}

/// Calendar day of `instant` as seen by the sender.
///
/// Expenses are dated by the message's send time in the configured zone, never by the
/// server's local clock.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}
