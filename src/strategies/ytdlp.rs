use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::watch_url;
use crate::orchestrator::{ContentId, DurationLookup};
use crate::Result;

/// Thin wrapper around the yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlp {
    path: String,
}

impl YtDlp {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Get video information using yt-dlp
    pub async fn video_info(&self, url: &str) -> Result<Value> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.path)
            .args(["--dump-json", "--no-playlist", "--skip-download", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .context("Failed to parse yt-dlp JSON output")?;

        Ok(info)
    }

    /// Download audio as mp3 into `dir`, returning the path of the written file
    pub async fn download_audio(&self, url: &str, dir: &Path, stem: &str) -> Result<PathBuf> {
        tracing::debug!("Downloading audio for: {}", url);

        let template = dir.join(format!("{}.%(ext)s", stem));
        let output = Command::new(&self.path)
            .args([
                "--output",
                &template.to_string_lossy(),
                // Extract audio in the most efficient format for transcription
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "9",
                "--format",
                "worstaudio[acodec^=mp4a]/worstaudio[ext=m4a]/worstaudio[ext=mp3]/worstaudio",
                "--no-playlist",
                "--concurrent-fragments",
                "4",
                "--newline",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to download audio: {}", error.trim());
        }

        let audio_path = dir.join(format!("{}.mp3", stem));
        if !audio_path.exists() {
            anyhow::bail!("yt-dlp finished but {} was not written", audio_path.display());
        }

        Ok(audio_path)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

/// Read the `duration` field of yt-dlp metadata, rounded up to whole seconds
pub fn duration_from_info(info: &Value) -> Option<u64> {
    info["duration"]
        .as_f64()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs.ceil() as u64)
}

/// Duration used by the audio gate; live streams have no end and count as unbounded
pub fn gate_duration(content_id: &ContentId, info: &Value) -> Result<u64> {
    if info["is_live"].as_bool() == Some(true) {
        return Ok(u64::MAX);
    }

    duration_from_info(info)
        .with_context(|| format!("yt-dlp metadata for {} has no duration", content_id))
}

#[async_trait]
impl DurationLookup for YtDlp {
    async fn duration_secs(&self, content_id: &ContentId) -> Result<u64> {
        let info = self.video_info(&watch_url(content_id)).await?;
        gate_duration(content_id, &info)
    }
}
