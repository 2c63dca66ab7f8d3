use chrono::NaiveDateTime;

/// Capture time encoded in a telemetry log filename.
///
/// Logs are named `YYYY-MM-DD HH-MM-SS...`: the date is the first 10 characters and
/// the time characters 11 to 19 with dashes standing in for colons.
/// Returns `None` when the name is too short or the fields do not form a date and time.
pub fn timestamp_from_filename(filename: &str) -> Option<NaiveDateTime> {
    let date = filename.get(0..10)?;
    let time = filename.get(11..19)?.replace('-', ":");
    let joined = format!("{} {}", date, time);
    match NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S") {
        Ok(timestamp) => Some(timestamp),
        Err(e) => {
            log::debug!("Telemetry name '{}' carries no timestamp: {}", filename, e);
            None
        }
    }
}
