//! Clock-style rendering of elapsed time.

/// Render milliseconds as `MM:SS`, or `MM:SS.cc` with centiseconds
///
/// All components truncate, so 59.999s shows as `00:59.99`, never `01:00`.
/// Minutes are not wrapped into hours.
pub fn format_elapsed(elapsed_ms: u64, show_centiseconds: bool) -> String {
    let total_seconds = elapsed_ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if show_centiseconds {
        let centiseconds = (elapsed_ms % 1000) / 10;
        format!("{:02}:{:02}.{:02}", minutes, seconds, centiseconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
