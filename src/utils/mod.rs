use regex::Regex;
use std::sync::OnceLock;
use url::Url;

static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn tag_pattern() -> &'static Regex {
    TAG_PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"))
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract a YouTube video ID from a bare ID or any common YouTube URL shape
pub fn extract_content_id(input: &str) -> Option<String> {
    let input = input.trim();

    if is_video_id(input) {
        return Some(input.to_string());
    }

    let url_str = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else if input.contains("youtube.com") || input.contains("youtu.be") {
        format!("https://{}", input)
    } else {
        return None;
    };

    let url = Url::parse(&url_str).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    match host {
        "youtu.be" => url
            .path_segments()?
            .next()
            .filter(|id| is_video_id(id))
            .map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
                return is_video_id(&id).then(|| id.to_string());
            }

            let segments: Vec<&str> = url.path_segments()?.collect();
            match segments.as_slice() {
                [prefix, id, ..] if matches!(*prefix, "embed" | "shorts" | "live" | "v") => {
                    is_video_id(id).then(|| id.to_string())
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Flatten an SRT document into plain text
pub fn srt_to_text(srt: &str) -> String {
    let lines: Vec<&str> = srt.lines().map(str::trim).collect();

    let mut text = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if line.is_empty() || line.contains("-->") {
            continue;
        }

        // A cue number is a digits-only line directly above a timing line
        let is_cue_number = line.chars().all(|c| c.is_ascii_digit())
            && lines.get(index + 1).is_some_and(|next| next.contains("-->"));
        if is_cue_number {
            continue;
        }

        let cleaned = tag_pattern().replace_all(line, "");
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() {
            text.push(cleaned.to_string());
        }
    }

    text.join(" ")
}

/// Collapse runs of whitespace into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format duration in human-readable format
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            match c {
                // Keep alphanumeric characters, spaces, hyphens, underscores, and dots
                c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
                _ => '_',
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!(
            "{} - required for duration lookup and audio transcription",
            yt_dlp_path
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content_id_from_urls() {
        let expected = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_content_id("dQw4w9WgXcQ"), expected);
        assert_eq!(
            extract_content_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            expected
        );
        assert_eq!(extract_content_id("youtube.com/watch?v=dQw4w9WgXcQ"), expected);
        assert_eq!(extract_content_id("https://youtu.be/dQw4w9WgXcQ?si=abc"), expected);
        assert_eq!(extract_content_id("https://m.youtube.com/watch?v=dQw4w9WgXcQ"), expected);
        assert_eq!(extract_content_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), expected);
        assert_eq!(extract_content_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"), expected);
        assert_eq!(extract_content_id("https://www.youtube.com/live/dQw4w9WgXcQ"), expected);
    }

    #[test]
    fn test_extract_content_id_rejects_garbage() {
        assert_eq!(extract_content_id(""), None);
        assert_eq!(extract_content_id("not a video"), None);
        assert_eq!(extract_content_id("https://vimeo.com/12345"), None);
        assert_eq!(extract_content_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_content_id("https://www.youtube.com/channel/UC123"), None);
    }

    #[test]
    fn test_srt_to_text() {
        let srt = "1\n00:00:01,000 --> 00:00:02,500\nNever gonna\n\n2\n00:00:02,500 --> 00:00:04,000\n<i>give you up</i>\n";
        assert_eq!(srt_to_text(srt), "Never gonna give you up");
    }

    #[test]
    fn test_srt_to_text_keeps_multiline_cues() {
        let srt = "1\r\n00:00:01,000 --> 00:00:02,000\r\nfirst line\r\nsecond line\r\n";
        assert_eq!(srt_to_text(srt), "first line second line");
    }

    #[test]
    fn test_srt_to_text_keeps_numeric_cues() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nCountdown:\n\n\
                   2\n00:00:02,000 --> 00:00:03,000\n3\n\n\
                   3\n00:00:03,000 --> 00:00:04,000\n1984\n";
        assert_eq!(srt_to_text(srt), "Countdown: 3 1984");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Hello World!"), "Hello World_");
        assert_eq!(sanitize_filename("test/file?name"), "test_file_name");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n b\t\tc "), "a b c");
    }
}
