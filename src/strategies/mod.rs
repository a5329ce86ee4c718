pub mod official;
pub mod unofficial;
pub mod ytdlp;

pub use official::OfficialApiStrategy;
pub use unofficial::UnofficialLibraryStrategy;
pub use ytdlp::YtDlp;

use crate::config::Config;
use crate::orchestrator::{ContentId, StrategyName, TranscriptOrchestrator};
use crate::transcribe::AudioTranscriptionStrategy;
use crate::Result;

/// Watch page URL for a content identifier
pub fn watch_url(content_id: &ContentId) -> String {
    format!(
        "https://www.youtube.com/watch?v={}",
        urlencoding::encode(content_id.as_str())
    )
}

/// `en` matches `en`, `en-US` and `EN-gb`; `en-US` matches only itself
pub fn language_matches(track_language: &str, preferred: &str) -> bool {
    let track = track_language.to_ascii_lowercase();
    let preferred = preferred.to_ascii_lowercase();

    track == preferred || track.starts_with(&format!("{}-", preferred))
}

/// Build the orchestrator with the default strategy for every tier
pub async fn build_orchestrator(config: &Config) -> Result<TranscriptOrchestrator> {
    let official = OfficialApiStrategy::new(&config.official_api)?;
    let unofficial = UnofficialLibraryStrategy::new(&config.unofficial)?;
    let audio = AudioTranscriptionStrategy::new(config).await?;
    let duration_lookup = YtDlp::new(config.audio.yt_dlp_path.clone());

    Ok(TranscriptOrchestrator::new(
        Box::new(official),
        Box::new(unofficial),
        Box::new(audio),
        Box::new(duration_lookup),
        config.duration_policy(),
    ))
}

/// What each tier needs before it is attempted
pub fn tier_prerequisite(name: StrategyName) -> &'static str {
    match name {
        StrategyName::OfficialApi => "requires an API key (YOUTUBE_API_KEY or official_api.api_key)",
        StrategyName::UnofficialLibrary => "always attempted",
        StrategyName::AudioTranscription => {
            "requires yt-dlp and an S3 bucket; skipped when duration exceeds the threshold"
        }
        StrategyName::AllFailed => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_matches() {
        assert!(language_matches("en", "en"));
        assert!(language_matches("en-US", "en"));
        assert!(language_matches("EN-gb", "en"));
        assert!(!language_matches("en", "en-US"));
        assert!(!language_matches("eno", "en"));
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            watch_url(&ContentId::new("dQw4w9WgXcQ")),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
