use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::language_matches;
use crate::config::OfficialApiConfig;
use crate::orchestrator::{ContentId, Credentials, TranscriptStrategy};
use crate::utils::srt_to_text;
use crate::{Result, TranscriptorError};

const CAPTIONS_URL: &str = "https://www.googleapis.com/youtube/v3/captions";

#[derive(Debug, Deserialize)]
struct CaptionListResponse {
    #[serde(default)]
    items: Vec<CaptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptionItem {
    id: String,
    snippet: CaptionSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionSnippet {
    language: String,
    #[serde(default)]
    track_kind: String,
    #[serde(default)]
    is_draft: bool,
}

impl CaptionItem {
    fn is_automatic(&self) -> bool {
        self.snippet.track_kind.eq_ignore_ascii_case("asr")
    }

    fn describe(&self) -> String {
        let kind = if self.is_automatic() { "auto" } else { "manual" };
        format!("{} {} track", kind, self.snippet.language)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// YouTube Data API v3 captions, manual tracks before automatic ones
pub struct OfficialApiStrategy {
    client: Client,
    languages: Vec<String>,
}

impl OfficialApiStrategy {
    pub fn new(config: &OfficialApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for the official captions API")?;

        Ok(Self {
            client,
            languages: config.languages.clone(),
        })
    }

    async fn list_captions(
        &self,
        content_id: &ContentId,
        credentials: &Credentials,
    ) -> Result<Vec<CaptionItem>> {
        tracing::debug!("Listing caption tracks for {}", content_id);

        let response = self
            .client
            .get(CAPTIONS_URL)
            .query(&[
                ("part", "snippet"),
                ("videoId", content_id.as_str()),
                ("key", credentials.api_key()),
            ])
            .send()
            .await
            .context("captions.list request failed")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read captions.list response")?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), "captions.list", &body).into());
        }

        let list: CaptionListResponse = serde_json::from_str(&body)
            .context("Failed to parse captions.list response")?;

        Ok(list.items)
    }

    async fn download_caption(
        &self,
        track: &CaptionItem,
        credentials: &Credentials,
    ) -> Result<String> {
        let url = format!("{}/{}", CAPTIONS_URL, urlencoding::encode(&track.id));

        let mut request = self
            .client
            .get(&url)
            .query(&[("tfmt", "srt"), ("key", credentials.api_key())]);
        if let Some(token) = credentials.access_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("captions.download request failed")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read captions.download response")?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), "captions.download", &body).into());
        }

        Ok(srt_to_text(&body))
    }
}

/// Manual tracks in preference order, then automatic tracks in preference order
fn select_tracks(items: &[CaptionItem], languages: &[String]) -> Vec<CaptionItem> {
    let usable: Vec<&CaptionItem> = items.iter().filter(|item| !item.snippet.is_draft).collect();

    let mut selected: Vec<CaptionItem> = Vec::new();
    for automatic in [false, true] {
        for language in languages {
            for item in &usable {
                if item.is_automatic() != automatic
                    || !language_matches(&item.snippet.language, language)
                {
                    continue;
                }
                // Overlapping preferences (e.g. "en-US" and "en") can match the same track
                if selected.iter().any(|chosen| chosen.id == item.id) {
                    continue;
                }
                selected.push((*item).clone());
            }
        }
    }

    selected
}

fn api_error(status: u16, endpoint: &str, body: &str) -> TranscriptorError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    TranscriptorError::Http {
        status,
        context: format!("{} ({})", endpoint, message.trim()),
    }
}

#[async_trait]
impl TranscriptStrategy for OfficialApiStrategy {
    async fn attempt(
        &self,
        content_id: &ContentId,
        credentials: Option<Credentials>,
    ) -> Result<String> {
        let credentials = credentials.ok_or_else(|| {
            TranscriptorError::ConfigError("official captions API requires an API key".to_string())
        })?;

        let items = self.list_captions(content_id, &credentials).await?;
        if items.is_empty() {
            return Err(TranscriptorError::CaptionsDisabled(content_id.to_string()).into());
        }

        let tracks = select_tracks(&items, &self.languages);
        if tracks.is_empty() {
            return Err(TranscriptorError::NoTranscriptFound(
                content_id.to_string(),
                self.languages.clone(),
            )
            .into());
        }

        let mut failures = Vec::new();
        for track in &tracks {
            match self.download_caption(track, &credentials).await {
                Ok(text) if !text.is_empty() => {
                    tracing::debug!(
                        "Official API returned {} for {}",
                        track.describe(),
                        content_id
                    );
                    return Ok(text);
                }
                Ok(_) => failures.push(format!("{}: empty", track.describe())),
                Err(error) => failures.push(format!("{}: {:#}", track.describe(), error)),
            }
        }

        anyhow::bail!("no caption track could be downloaded ({})", failures.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, language: &str, kind: &str) -> CaptionItem {
        CaptionItem {
            id: id.to_string(),
            snippet: CaptionSnippet {
                language: language.to_string(),
                track_kind: kind.to_string(),
                is_draft: false,
            },
        }
    }

    #[test]
    fn test_manual_tracks_before_automatic() {
        let items = vec![
            item("asr-en", "en", "asr"),
            item("std-de", "de", "standard"),
            item("std-en", "en-US", "standard"),
        ];
        let languages = vec!["en".to_string(), "de".to_string()];

        let ids: Vec<String> = select_tracks(&items, &languages)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["std-en", "std-de", "asr-en"]);
    }

    #[test]
    fn test_overlapping_languages_select_track_once() {
        let items = vec![item("t", "en-US", "standard")];
        let languages = vec!["en-US".to_string(), "en".to_string()];

        let ids: Vec<String> = select_tracks(&items, &languages)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t"]);
    }

    #[test]
    fn test_draft_tracks_ignored() {
        let mut draft = item("draft", "en", "standard");
        draft.snippet.is_draft = true;

        assert!(select_tracks(&[draft], &["en".to_string()]).is_empty());
    }

    #[test]
    fn test_caption_list_parsing() {
        let body = r#"{"items":[{"id":"abc","snippet":{"language":"en","trackKind":"asr"}}]}"#;
        let parsed: CaptionListResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.items.len(), 1);
        assert!(parsed.items[0].is_automatic());
    }

    #[test]
    fn test_api_error_uses_google_message() {
        let body = r#"{"error":{"code":403,"message":"The permissions associated with the request are not sufficient"}}"#;
        let error = api_error(403, "captions.download", body);

        assert_eq!(
            error.to_string(),
            "HTTP 403 from captions.download (The permissions associated with the request are not sufficient)"
        );
    }
}
