//! Content type classification for audio uploads.

/// Fallback for unrecognized files.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Map a file name to the content type used when uploading it.
pub fn classify(file_name: &str) -> &'static str {
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return OCTET_STREAM,
    };

    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/mp4",
        "3gp" | "3gpp" => "audio/3gpp",
        "ogg" | "oga" => "audio/ogg",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(classify("clip.wav"), "audio/wav");
        assert_eq!(classify("clip.MP3"), "audio/mpeg");
        assert_eq!(classify("note.m4a"), "audio/mp4");
        assert_eq!(classify("note.aac"), "audio/mp4");
        assert_eq!(classify("rec.3gp"), "audio/3gpp");
        assert_eq!(classify("rec.3GPP"), "audio/3gpp");
        assert_eq!(classify("voice.ogg"), "audio/ogg");
        assert_eq!(classify("voice.oga"), "audio/ogg");
    }

    #[test]
    fn test_unknown_and_missing_extensions() {
        assert_eq!(classify("notes.txt"), OCTET_STREAM);
        assert_eq!(classify("recording"), OCTET_STREAM);
        assert_eq!(classify(""), OCTET_STREAM);
        assert_eq!(classify("trailing."), OCTET_STREAM);
    }

    #[test]
    fn test_never_empty() {
        for name in ["a.wav", "b", ".", "..", "x.flac", "日本.ogg"] {
            assert!(!classify(name).is_empty(), "empty mime for {name}");
        }
    }
}
