// Numeric coercion for staged columns. Anything unparseable becomes null.

/// Parse an integer cell. Integral floats ("3.0") are accepted.
pub fn to_integer(raw: &str) -> Option<String> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n.to_string());
    }
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some((f as i64).to_string())
    } else {
        None
    }
}

pub fn to_float(raw: &str) -> Option<String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.to_string())
}

/// Convert a lap time `m:ss.mmm` into total milliseconds.
///
/// The fractional part is read as a plain integer count of milliseconds,
/// so "1:05.2" is 65_002, matching how the timing extracts write it.
pub fn lap_time_to_ms(raw: &str) -> Option<i64> {
    let (minutes, rest) = raw.trim().split_once(':')?;
    let (seconds, millis) = rest.split_once('.')?;
    let minutes: i64 = minutes.trim().parse().ok()?;
    let seconds: i64 = seconds.trim().parse().ok()?;
    let millis: i64 = millis.trim().parse().ok()?;
    minutes
        .checked_mul(60_000)?
        .checked_add(seconds.checked_mul(1_000)?)?
        .checked_add(millis)
}
