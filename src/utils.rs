use chrono::{DateTime, Local, Utc};

const MARQUEE_GAP: &str = "   •   ";
const PROGRESS_SEGMENT: usize = 8;

pub fn format_local(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_optional(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(format_local).unwrap_or_else(|| "—".to_string())
}

pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// A `width`-wide slice of `text` scrolled by `offset` characters, wrapping around.
/// Text that already fits is returned unchanged.
pub fn marquee(text: &str, width: usize, offset: usize) -> String {
    let len = text.chars().count();
    if width == 0 || len <= width {
        return text.to_string();
    }
    let looped: Vec<char> = text.chars().chain(MARQUEE_GAP.chars()).collect();
    let start = offset % looped.len();
    looped.iter().cycle().skip(start).take(width).collect()
}

/// Indeterminate progress track: a segment sweeping back and forth across `width`.
pub fn progress_track(width: usize, frame: u64) -> String {
    if width == 0 {
        return String::new();
    }
    let segment = PROGRESS_SEGMENT.min(width);
    let travel = width - segment;
    let pos = if travel == 0 {
        0
    } else {
        let period = 2 * travel as u64;
        let step = (frame % period) as usize;
        if step <= travel { step } else { 2 * travel - step }
    };
    let mut track = String::with_capacity(width * 3);
    for i in 0..width {
        track.push(if i >= pos && i < pos + segment { '━' } else { '─' });
    }
    track
}

/// Keeps `selected` inside a list of `len` entries.
pub fn clamp_selection(selected: usize, len: usize) -> usize {
    if len == 0 { 0 } else { selected.min(len - 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marquee_leaves_short_text_alone() {
        assert_eq!(marquee("340 lines", 20, 5), "340 lines");
    }

    #[test]
    fn marquee_scrolls_and_wraps() {
        let text = "abcdefghij";
        assert_eq!(marquee(text, 4, 0), "abcd");
        assert_eq!(marquee(text, 4, 8), "ij  ");
        let cycle = text.chars().count() + MARQUEE_GAP.chars().count();
        assert_eq!(marquee(text, 4, cycle), "abcd");
    }

    #[test]
    fn progress_segment_bounces() {
        let track = progress_track(10, 0);
        assert_eq!(track.chars().count(), 10);
        assert!(track.starts_with("━━━━━━━━"));
        assert!(progress_track(10, 2).ends_with("━━━━━━━━"));
        assert_eq!(progress_track(10, 3), progress_track(10, 1));
        assert_eq!(progress_track(4, 7).chars().filter(|c| *c == '━').count(), 4);
        assert!(progress_track(0, 3).is_empty());
    }

    #[test]
    fn short_sha_handles_short_input() {
        assert_eq!(short_sha("0123456789abcdef"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
    }

    #[test]
    fn selection_clamps() {
        assert_eq!(clamp_selection(5, 3), 2);
        assert_eq!(clamp_selection(1, 3), 1);
        assert_eq!(clamp_selection(4, 0), 0);
    }

    #[test]
    fn missing_timestamp_renders_dash() {
        assert_eq!(format_optional(None), "—");
    }
}
