use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_transcribe::types::{LanguageCode, Media, MediaFormat};
use aws_sdk_transcribe::Client as TranscribeClient;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::{AudioConfig, Config};
use crate::orchestrator::{ContentId, Credentials, TranscriptStrategy};
use crate::strategies::{watch_url, YtDlp};
use crate::{Result, TranscriptorError};

pub mod processor;

use processor::TranscriptionProcessor;

/// Downloads the audio and transcribes it with AWS Transcribe
pub struct AudioTranscriptionStrategy {
    config: AudioConfig,
    yt_dlp: YtDlp,
    s3_client: S3Client,
    transcribe_client: TranscribeClient,
    http: reqwest::Client,
}

impl AudioTranscriptionStrategy {
    /// Create the strategy; AWS credentials are resolved lazily on first use
    pub async fn new(config: &Config) -> Result<Self> {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(config.aws_region())
            .load()
            .await;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client for transcript download")?;

        Ok(Self {
            config: config.audio.clone(),
            yt_dlp: YtDlp::new(config.audio.yt_dlp_path.clone()),
            s3_client: S3Client::new(&aws_config),
            transcribe_client: TranscribeClient::new(&aws_config),
            http,
        })
    }

    /// Upload audio file to S3
    async fn upload_to_s3(&self, audio_path: &Path, content_id: &ContentId) -> Result<String> {
        let key = format!(
            "{}{}_{}_{}.mp3",
            self.config.aws.s3_key_prefix.as_deref().unwrap_or(""),
            content_id,
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            &Uuid::new_v4().to_string()[..8],
        );

        tracing::info!("Uploading audio to S3: s3://{}/{}", self.config.aws.s3_bucket, key);

        let content = fs_err::read(audio_path)?;

        self.s3_client
            .put_object()
            .bucket(&self.config.aws.s3_bucket)
            .key(&key)
            .body(content.into())
            .content_type("audio/mpeg")
            .send()
            .await
            .context("Failed to upload audio to S3")?;

        Ok(key)
    }

    /// Start AWS Transcribe job, auto-detecting the language unless one is configured
    async fn start_transcription_job(&self, s3_key: &str) -> Result<String> {
        let job_name = format!("transcript_fallback_{}", Uuid::new_v4());
        let media_uri = format!("s3://{}/{}", self.config.aws.s3_bucket, s3_key);

        tracing::info!("Starting transcription job: {}", job_name);

        let media = Media::builder().media_file_uri(media_uri).build();

        let mut job_builder = self
            .transcribe_client
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .media_format(MediaFormat::Mp3)
            .media(media);

        job_builder = match self.config.aws.default_language.as_deref() {
            Some(lang) => {
                tracing::debug!("Using configured language: {}", lang);
                job_builder.language_code(LanguageCode::from(lang))
            }
            None => job_builder.identify_language(true),
        };

        job_builder
            .send()
            .await
            .context("Failed to start transcription job")?;

        Ok(job_name)
    }

    /// Clean up S3 object
    async fn cleanup_s3(&self, s3_key: &str) -> Result<()> {
        tracing::debug!("Cleaning up S3 object: {}", s3_key);

        self.s3_client
            .delete_object()
            .bucket(&self.config.aws.s3_bucket)
            .key(s3_key)
            .send()
            .await
            .context("Failed to clean up S3 object")?;

        Ok(())
    }

    async fn transcribe_uploaded(&self, s3_key: &str) -> Result<String> {
        let job_name = self.start_transcription_job(s3_key).await?;

        TranscriptionProcessor::new(
            self.transcribe_client.clone(),
            self.http.clone(),
            job_name,
            Duration::from_secs(self.config.aws.max_poll_secs),
        )
        .wait_for_completion()
        .await
    }
}

#[async_trait]
impl TranscriptStrategy for AudioTranscriptionStrategy {
    async fn attempt(
        &self,
        content_id: &ContentId,
        _credentials: Option<Credentials>,
    ) -> Result<String> {
        if self.config.aws.s3_bucket.trim().is_empty() {
            return Err(TranscriptorError::ConfigError(
                "audio.aws.s3_bucket is not set".to_string(),
            )
            .into());
        }

        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;
        let stem = format!("audio_{}", &Uuid::new_v4().to_string()[..8]);

        let audio_path = self
            .yt_dlp
            .download_audio(&watch_url(content_id), temp_dir.path(), &stem)
            .await?;

        let s3_key = self.upload_to_s3(&audio_path, content_id).await?;
        let outcome = self.transcribe_uploaded(&s3_key).await;

        if let Err(e) = self.cleanup_s3(&s3_key).await {
            tracing::warn!("{:#}", e);
        }

        outcome
    }
}
