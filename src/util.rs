/// Format a duration in seconds as `m:ss` for chat and list display.
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0:00".to_string();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Derive (artist, title) from an `"Artist - Title.ext"` filename.
/// Falls back to the whole stem as title when there is no separator.
pub fn metadata_from_filename(filename: &str) -> (Option<String>, String) {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _ext)| stem)
        .unwrap_or(filename);

    match stem.split_once(" - ") {
        Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
            (Some(artist.trim().to_string()), title.trim().to_string())
        }
        _ => (None, stem.trim().to_string()),
    }
}

pub fn is_audio_mime(mime: &str) -> bool {
    mime.starts_with("audio/")
}

/// Truncate to `max` characters for inline keyboard labels.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(-5), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(61), "1:01");
        assert_eq!(format_duration(3600), "60:00");
    }

    #[test]
    fn filename_with_artist_and_title() {
        let (artist, title) = metadata_from_filename("Artist - Title.mp3");
        assert_eq!(artist.as_deref(), Some("Artist"));
        assert_eq!(title, "Title");
    }

    #[test]
    fn filename_with_dash_in_title() {
        let (artist, title) = metadata_from_filename("Daft Punk - Harder - Better.flac");
        assert_eq!(artist.as_deref(), Some("Daft Punk"));
        assert_eq!(title, "Harder - Better");
    }

    #[test]
    fn filename_without_separator() {
        let (artist, title) = metadata_from_filename("voicemail.ogg");
        assert_eq!(artist, None);
        assert_eq!(title, "voicemail");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 25), "short");
        assert_eq!(truncate("ครับผมขอบคุณมากครับ", 5), "ครับผ");
    }

    #[test]
    fn audio_mime_detection() {
        assert!(is_audio_mime("audio/mpeg"));
        assert!(is_audio_mime("audio/flac"));
        assert!(!is_audio_mime("video/mp4"));
    }
}
