use crate::error::ScheduleError;

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Parses a schedule duration such as `3h2m3s`, `0.3s`, `250ms` or `5` into
/// milliseconds.
///
/// Tokens are `<number>[d|h|m|s|ms]` and may be concatenated. A bare number
/// means seconds. Each token is truncated to whole milliseconds on its own.
///
/// # Errors
///
/// Returns an error when the value is empty, a token has no number, the unit
/// is unknown, or the total does not fit into `u64` milliseconds.
pub fn parse_duration_ms(value: &str) -> Result<u64, ScheduleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ScheduleError::DurationEmpty);
    }

    let mut total: u64 = 0;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let number_len = rest
            .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(ScheduleError::InvalidDuration {
                value: trimmed.to_owned(),
            });
        }
        let (number_part, after_number) = rest.split_at(number_len);
        let number: f64 = number_part
            .parse()
            .map_err(|_err| ScheduleError::InvalidDuration {
                value: trimmed.to_owned(),
            })?;

        let (multiplier, unit_len) = match unit_prefix(after_number) {
            Some(unit) => unit,
            None => {
                let unit: String = after_number
                    .chars()
                    .take_while(|ch| !(ch.is_ascii_digit() || *ch == '.'))
                    .collect();
                return Err(ScheduleError::InvalidDurationUnit {
                    unit,
                    value: trimmed.to_owned(),
                });
            }
        };

        let token_ms = token_to_ms(number, multiplier).ok_or_else(|| {
            ScheduleError::DurationOverflow {
                value: trimmed.to_owned(),
            }
        })?;
        total = total
            .checked_add(token_ms)
            .ok_or_else(|| ScheduleError::DurationOverflow {
                value: trimmed.to_owned(),
            })?;
        rest = after_number.get(unit_len..).unwrap_or_default();
    }

    Ok(total)
}

fn unit_prefix(rest: &str) -> Option<(f64, usize)> {
    if rest.starts_with("ms") {
        return Some((1.0, 2));
    }
    match rest.chars().next() {
        None => Some((MS_PER_SECOND, 0)),
        Some(ch) if ch.is_ascii_digit() || ch == '.' => Some((MS_PER_SECOND, 0)),
        Some('s') => Some((MS_PER_SECOND, 1)),
        Some('m') => Some((MS_PER_MINUTE, 1)),
        Some('h') => Some((MS_PER_HOUR, 1)),
        Some('d') => Some((MS_PER_DAY, 1)),
        Some(_) => None,
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "Fractional duration tokens are scaled in floating point and truncated once."
)]
fn token_to_ms(number: f64, multiplier: f64) -> Option<u64> {
    let scaled = (number * multiplier).trunc();
    if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
        return None;
    }
    Some(scaled as u64)
}

/// Formats milliseconds the way schedule steps are written back out.
#[must_use]
pub fn format_duration_ms(duration_ms: u64) -> String {
    if duration_ms % 1_000 == 0 {
        format!("{}s", duration_ms / 1_000)
    } else {
        format!("{}ms", duration_ms)
    }
}
