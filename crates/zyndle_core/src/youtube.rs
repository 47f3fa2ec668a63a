//! crates/zyndle_core/src/youtube.rs
//!
//! Recognizes YouTube video URLs before anything is sent to the backend.

use regex::Regex;
use std::sync::LazyLock;

static DIRECT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#/]+)")
        .expect("valid video id pattern")
});

static QUERY_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtube\.com/watch\?.*?\bv=([^&\n?#]+)").expect("valid query id pattern")
});

/// Extracts the video id from the common YouTube URL forms.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    [&*DIRECT_ID, &*QUERY_ID]
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}
