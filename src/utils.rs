use std::str::FromStr;
use tokio::time::Duration;

/// Parses a Go-style suffixed duration string: "200ms", "15s", "10m", "5h", "3d".
///
/// Supported units, longest suffix matched first so `ms` isn't swallowed by `s`:
/// - `ms` for milliseconds
/// - `s` for seconds
/// - `m` for minutes
/// - `h` for hours
/// - `d` for days
pub fn parse_duration_string(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration string cannot be empty".to_string());
    }

    let (value_str, unit) = if let Some(v) = s.strip_suffix("ms") {
        (v, "ms")
    } else if let Some(v) = s.strip_suffix('s') {
        (v, "s")
    } else if let Some(v) = s.strip_suffix('m') {
        (v, "m")
    } else if let Some(v) = s.strip_suffix('h') {
        (v, "h")
    } else if let Some(v) = s.strip_suffix('d') {
        (v, "d")
    } else {
        return Err(format!(
            "Unknown duration unit in '{}'. Use one of 'ms', 's', 'm', 'h', 'd'.",
            s
        ));
    };

    let value = match u64::from_str(value_str) {
        Ok(v) => v,
        Err(_) => return Err(format!("Invalid numeric value in duration: '{}'", value_str)),
    };

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        "d" => Ok(Duration::from_secs(value * 24 * 60 * 60)),
        _ => unreachable!(),
    }
}
