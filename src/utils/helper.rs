use chrono::Utc;

/// Get current timestamp in milliseconds since epoch
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Round `value` to `decimals` places and render it without trailing zeros,
/// so `1.0` prints as `1` and `0.32150` as `0.3215`.
pub fn format_trimmed(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    if !fixed.contains('.') {
        return fixed;
    }
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
