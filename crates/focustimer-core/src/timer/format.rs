/// Format a number of seconds for display.
///
/// Negative input is treated as zero. The hours field is only shown when
/// there is at least one full hour.
pub fn format_time(seconds: i64, show_seconds: bool) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    match (hours > 0, show_seconds) {
        (true, true) => format!("{hours:02}:{minutes:02}:{secs:02}"),
        (true, false) => format!("{hours:02}:{minutes:02}"),
        (false, true) => format!("{minutes:02}:{secs:02}"),
        (false, false) => format!("{minutes:02} min"),
    }
}
