use anyhow::Context;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use reqwest::cookie::Jar;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{language_matches, watch_url};
use crate::config::UnofficialConfig;
use crate::orchestrator::{ContentId, Credentials, TranscriptStrategy};
use crate::utils::normalize_whitespace;
use crate::{Result, TranscriptorError};

const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";

/// A caption track advertised by the player response
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    pub is_generated: bool,
}

/// Caption tracks scraped from the watch page and InnerTube player API
pub struct UnofficialLibraryStrategy {
    client: Client,
    cookies: Arc<Jar>,
    languages: Vec<String>,
    request_delay: Duration,
}

impl UnofficialLibraryStrategy {
    pub fn new(config: &UnofficialConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US"),
        );

        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for caption scraping")?;

        Ok(Self {
            client,
            cookies,
            languages: config.languages.clone(),
            request_delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    async fn delay(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }

    async fn fetch_watch_html(&self, content_id: &ContentId) -> Result<String> {
        let url = watch_url(content_id);
        let html = self.get_text(&url, content_id).await?;

        if !html.contains(CONSENT_FORM_MARKER) {
            return Ok(html);
        }

        tracing::debug!("Consent page served for {}, setting consent cookie", content_id);
        self.set_consent_cookie(&html)?;
        self.delay().await;

        let html = self.get_text(&url, content_id).await?;
        if html.contains(CONSENT_FORM_MARKER) {
            anyhow::bail!("failed to accept the YouTube consent page for {}", content_id);
        }

        Ok(html)
    }

    async fn get_text(&self, url: &str, content_id: &ContentId) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                Err(TranscriptorError::IpBlocked(content_id.to_string()).into())
            }
            status if !status.is_success() => Err(TranscriptorError::Http {
                status: status.as_u16(),
                context: url.to_string(),
            }
            .into()),
            _ => response.text().await.context("Failed to read response body"),
        }
    }

    fn set_consent_cookie(&self, html: &str) -> Result<()> {
        let re = Regex::new(r#"name="v" value="(.*?)""#).context("invalid consent pattern")?;
        let value = re
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .context("consent form did not contain a consent value")?;

        let url = "https://www.youtube.com".parse::<url::Url>()?;
        self.cookies
            .add_cookie_str(&format!("CONSENT=YES+{}; Domain=.youtube.com", value), &url);
        Ok(())
    }

    async fn fetch_player_response(&self, content_id: &ContentId, api_key: &str) -> Result<Value> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": content_id.as_str()
        });

        self.delay().await;

        let response = self
            .client
            .post(INNERTUBE_PLAYER_URL)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .context("InnerTube player request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptorError::Http {
                status: status.as_u16(),
                context: "InnerTube player".to_string(),
            }
            .into());
        }

        response
            .json()
            .await
            .context("Failed to parse InnerTube player response")
    }

    async fn fetch_track_text(&self, track: &CaptionTrack) -> Result<String> {
        let url = track.base_url.replace("&fmt=srv3", "");
        self.delay().await;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("caption track request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptorError::Http {
                status: status.as_u16(),
                context: "caption track".to_string(),
            }
            .into());
        }

        let xml = response.text().await.context("Failed to read caption track")?;
        parse_timedtext(&xml)
    }
}

/// Pull the InnerTube API key out of the watch page
pub fn extract_innertube_api_key(html: &str, content_id: &ContentId) -> Result<String> {
    if html.contains("class=\"g-recaptcha\"") {
        return Err(TranscriptorError::IpBlocked(content_id.to_string()).into());
    }

    let re = Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#)
        .context("invalid API key pattern")?;

    re.captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "watch page for {} did not contain an InnerTube API key",
                content_id
            )
        })
}

/// Read the advertised caption tracks, surfacing playability problems as errors
pub fn parse_caption_tracks(content_id: &ContentId, player: &Value) -> Result<Vec<CaptionTrack>> {
    let playability = &player["playabilityStatus"];
    let status = playability["status"].as_str().unwrap_or("OK");
    if status != "OK" {
        let reason = playability["reason"]
            .as_str()
            .unwrap_or("no reason given")
            .to_string();

        if status == "LOGIN_REQUIRED" && reason.to_lowercase().contains("bot") {
            return Err(TranscriptorError::IpBlocked(content_id.to_string()).into());
        }
        return Err(TranscriptorError::VideoUnavailable(content_id.to_string(), reason).into());
    }

    let renderer = &player["captions"]["playerCaptionsTracklistRenderer"];
    let tracks = renderer["captionTracks"]
        .as_array()
        .ok_or_else(|| TranscriptorError::CaptionsDisabled(content_id.to_string()))?;

    let tracks: Vec<CaptionTrack> = tracks
        .iter()
        .filter_map(|track| {
            Some(CaptionTrack {
                base_url: track["baseUrl"].as_str()?.to_string(),
                language_code: track["languageCode"].as_str()?.to_string(),
                is_generated: track["kind"].as_str() == Some("asr"),
            })
        })
        .collect();

    if tracks.is_empty() {
        return Err(TranscriptorError::CaptionsDisabled(content_id.to_string()).into());
    }

    Ok(tracks)
}

/// Manually created tracks win over generated ones; language preference breaks ties
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> Option<&'a CaptionTrack> {
    [false, true].into_iter().find_map(|generated| {
        languages.iter().find_map(|language| {
            tracks.iter().find(|track| {
                track.is_generated == generated && language_matches(&track.language_code, language)
            })
        })
    })
}

/// Flatten a timedtext document (`<text>` or srv3 `<p>` cues) into plain text
pub fn parse_timedtext(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut cues = Vec::new();
    let mut current = String::new();
    let mut in_cue = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                in_cue = true;
                current.clear();
            }
            Ok(Event::Text(e)) if in_cue => {
                let text = e.unescape().context("malformed caption text")?;
                current.push_str(&decode_entities(&text));
                current.push(' ');
            }
            Ok(Event::End(e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                in_cue = false;
                let cue = normalize_whitespace(&current);
                if !cue.is_empty() {
                    cues.push(cue);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => anyhow::bail!(
                "malformed caption XML at position {}: {}",
                reader.buffer_position(),
                e
            ),
        }
    }

    Ok(cues.join(" "))
}

/// Caption payloads are frequently double-escaped (`&amp;#39;`)
fn decode_entities(text: &str) -> String {
    quick_xml::escape::unescape(text)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| text.to_string())
}

#[async_trait]
impl TranscriptStrategy for UnofficialLibraryStrategy {
    async fn attempt(
        &self,
        content_id: &ContentId,
        _credentials: Option<Credentials>,
    ) -> Result<String> {
        let html = self.fetch_watch_html(content_id).await?;
        let api_key = extract_innertube_api_key(&html, content_id)?;
        let player = self.fetch_player_response(content_id, &api_key).await?;
        let tracks = parse_caption_tracks(content_id, &player)?;

        let track = select_track(&tracks, &self.languages).ok_or_else(|| {
            TranscriptorError::NoTranscriptFound(content_id.to_string(), self.languages.clone())
        })?;

        tracing::debug!(
            "Using {} {} captions for {}",
            if track.is_generated { "auto-generated" } else { "manual" },
            track.language_code,
            content_id
        );

        self.fetch_track_text(track).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track(language: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.com/{}", language),
            language_code: language.to_string(),
            is_generated: generated,
        }
    }

    #[test]
    fn test_parse_timedtext_legacy_format() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.5">Hello &amp;amp; welcome</text><text start="1.5" dur="2">it&amp;#39;s   me</text></transcript>"#;

        assert_eq!(parse_timedtext(xml).unwrap(), "Hello & welcome it's me");
    }

    #[test]
    fn test_parse_timedtext_srv3_format() {
        let xml = r#"<timedtext format="3"><body><p t="0" d="1000"><s>auto</s><s t="200"> caption</s></p><p t="1000" d="500">text</p></body></timedtext>"#;

        assert_eq!(parse_timedtext(xml).unwrap(), "auto caption text");
    }

    #[test]
    fn test_select_track_prefers_manual() {
        let tracks = vec![track("en", true), track("de", false), track("en-GB", false)];
        let languages = vec!["en".to_string(), "de".to_string()];

        assert_eq!(select_track(&tracks, &languages), Some(&tracks[2]));
    }

    #[test]
    fn test_select_track_falls_back_to_generated() {
        let tracks = vec![track("fr", false), track("en", true)];

        assert_eq!(select_track(&tracks, &["en".to_string()]), Some(&tracks[1]));
        assert_eq!(select_track(&tracks, &["ja".to_string()]), None);
    }

    #[test]
    fn test_missing_captions_renderer_means_disabled() {
        let id = ContentId::new("abcdefghijk");
        let player = json!({ "playabilityStatus": { "status": "OK" } });

        let error = parse_caption_tracks(&id, &player).unwrap_err();
        assert_eq!(error.to_string(), "captions disabled for abcdefghijk");
    }

    #[test]
    fn test_unplayable_video_reports_reason() {
        let id = ContentId::new("abcdefghijk");
        let player = json!({
            "playabilityStatus": { "status": "ERROR", "reason": "Video unavailable" }
        });

        let error = parse_caption_tracks(&id, &player).unwrap_err();
        assert_eq!(error.to_string(), "video abcdefghijk is unavailable: Video unavailable");
    }

    #[test]
    fn test_caption_tracks_parsed() {
        let id = ContentId::new("abcdefghijk");
        let player = json!({
            "playabilityStatus": { "status": "OK" },
            "captions": { "playerCaptionsTracklistRenderer": { "captionTracks": [
                { "baseUrl": "https://example.com/a", "languageCode": "en", "kind": "asr" },
                { "baseUrl": "https://example.com/b", "languageCode": "de" }
            ]}}
        });

        let tracks = parse_caption_tracks(&id, &player).unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks[0].is_generated);
        assert!(!tracks[1].is_generated);
    }

    #[test]
    fn test_api_key_extraction() {
        let id = ContentId::new("abcdefghijk");
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-test_key"});</script>"#;

        assert_eq!(extract_innertube_api_key(html, &id).unwrap(), "AIzaSyA-test_key");
        assert!(extract_innertube_api_key("<div class=\"g-recaptcha\"></div>", &id).is_err());
        assert!(extract_innertube_api_key("<html></html>", &id).is_err());
    }
}
