/// Parses a "HH:MM" string into minutes past midnight.
/// Returns `None` for anything that is not a well-formed time of day.
pub fn parse(text: &str) -> Option<u32> {
    let (hours, minutes) = text.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn format(minutes_past_midnight: u32) -> String {
    format!(
        "{:02}:{:02}",
        minutes_past_midnight / 60,
        minutes_past_midnight % 60
    )
}
