//! Human-readable elapsed times for log lines and issue descriptions.

const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// Render `secs` as its two most significant non-zero units, e.g. `10m 5s`
/// or `2h`. Zero renders as `0s`.
pub fn format_duration(secs: u64) -> String {
    let parts: Vec<String> = UNITS
        .iter()
        .scan(secs, |rest, &(size, suffix)| {
            let count = *rest / size;
            *rest %= size;
            Some((count, suffix))
        })
        .skip_while(|(count, _)| *count == 0)
        .take(2)
        .filter(|(count, _)| *count > 0)
        .map(|(count, suffix)| format!("{count}{suffix}"))
        .collect();
    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}
