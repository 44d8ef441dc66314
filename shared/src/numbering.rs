//! Human-readable reference numbers: `{PREFIX}-{YEAR}-{NNN}`

/// Sequence part of a reference number, if it belongs to `prefix` and `year`
///
/// Numbers whose third segment is not numeric are ignored.
pub fn parse_sequence(number: &str, prefix: &str, year: i32) -> Option<u32> {
    let mut parts = number.split('-');
    if parts.next()? != prefix {
        return None;
    }
    if parts.next()?.parse::<i32>().ok()? != year {
        return None;
    }
    parts.next()?.trim().parse::<u32>().ok()
}

/// Format a reference number with the sequence padded to three digits
pub fn format_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{prefix}-{year}-{sequence:03}")
}

/// The number following the highest sequence already used for `prefix` in `year`
pub fn next_number<'a, I>(prefix: &str, year: i32, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|n| parse_sequence(n, prefix, year))
        .max()
        .unwrap_or(0);
    format_number(prefix, year, highest.saturating_add(1))
}

/// Clock-derived number used when the stored numbers cannot be read
pub fn fallback_number(prefix: &str, year: i32, epoch_millis: i64) -> String {
    format!("{prefix}-{year}-{:06}", epoch_millis.rem_euclid(1_000_000))
}
