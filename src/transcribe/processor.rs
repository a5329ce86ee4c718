use anyhow::{Context, Result};
use aws_sdk_transcribe::types::{TranscriptionJob, TranscriptionJobStatus};
use aws_sdk_transcribe::Client as TranscribeClient;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::TranscriptorError;

/// AWS Transcribe transcript format (only the parts we read)
#[derive(Debug, Deserialize)]
struct AwsTranscript {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptText>,
}

#[derive(Debug, Deserialize)]
struct TranscriptText {
    transcript: String,
}

/// Transcription job processor
pub struct TranscriptionProcessor {
    client: TranscribeClient,
    http: reqwest::Client,
    job_name: String,
    max_wait: Duration,
}

impl TranscriptionProcessor {
    pub fn new(
        client: TranscribeClient,
        http: reqwest::Client,
        job_name: String,
        max_wait: Duration,
    ) -> Self {
        Self { client, http, job_name, max_wait }
    }

    /// Poll until the job finishes, then return its transcript text
    pub async fn wait_for_completion(&self) -> Result<String> {
        let start_time = Instant::now();
        let mut check_count: u64 = 0;

        let job = loop {
            check_count += 1;

            let job = self.get_transcription_job().await?;

            match job.transcription_job_status() {
                Some(TranscriptionJobStatus::InProgress) | Some(TranscriptionJobStatus::Queued) => {
                    if start_time.elapsed() >= self.max_wait {
                        return Err(TranscriptorError::TranscriptionFailed(format!(
                            "job {} still running after {}s",
                            self.job_name,
                            start_time.elapsed().as_secs()
                        ))
                        .into());
                    }

                    tracing::debug!(
                        "Transcribing... ({}s elapsed, check #{})",
                        start_time.elapsed().as_secs(),
                        check_count
                    );

                    sleep(poll_interval(check_count)).await;
                }
                Some(TranscriptionJobStatus::Completed) => break job,
                Some(TranscriptionJobStatus::Failed) => {
                    let failure_reason = job.failure_reason().unwrap_or("Unknown error");
                    return Err(
                        TranscriptorError::TranscriptionFailed(failure_reason.to_string()).into()
                    );
                }
                other => {
                    return Err(TranscriptorError::TranscriptionFailed(format!(
                        "unexpected job status {:?}",
                        other
                    ))
                    .into());
                }
            }
        };

        tracing::info!(
            "Transcription job {} completed in {}s",
            self.job_name,
            start_time.elapsed().as_secs()
        );

        self.fetch_transcript_text(&job).await
    }

    /// Get transcription job details
    async fn get_transcription_job(&self) -> Result<TranscriptionJob> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(&self.job_name)
            .send()
            .await
            .context("Failed to get transcription job status")?;

        response
            .transcription_job()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Transcription job not found"))
    }

    async fn fetch_transcript_text(&self, job: &TranscriptionJob) -> Result<String> {
        let transcript_uri = job
            .transcript()
            .and_then(|t| t.transcript_file_uri())
            .ok_or_else(|| anyhow::anyhow!("No transcript URI found"))?;

        let response = self
            .http
            .get(transcript_uri)
            .send()
            .await
            .context("Failed to download transcript")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download transcript: HTTP {}", response.status());
        }

        let body = response.text().await.context("Failed to read transcript")?;
        parse_transcript_json(&body)
    }
}

/// Backoff between status checks: 5s, growing by 2s per check, capped at 30s
fn poll_interval(check_count: u64) -> Duration {
    Duration::from_secs(std::cmp::min(5 + check_count.saturating_sub(1) * 2, 30))
}

fn parse_transcript_json(body: &str) -> Result<String> {
    let aws_transcript: AwsTranscript = serde_json::from_str(body)
        .context("Failed to parse transcript JSON")?;

    Ok(aws_transcript
        .results
        .transcripts
        .into_iter()
        .map(|t| t.transcript)
        .collect::<Vec<_>>()
        .join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval_backoff() {
        assert_eq!(poll_interval(1), Duration::from_secs(5));
        assert_eq!(poll_interval(2), Duration::from_secs(7));
        assert_eq!(poll_interval(50), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_transcript_json() {
        let body = r#"{
            "jobName": "transcript_fallback_1",
            "accountId": "123",
            "results": {
                "transcripts": [{ "transcript": "Hello from the audio tier." }],
                "items": []
            },
            "status": "COMPLETED"
        }"#;

        assert_eq!(parse_transcript_json(body).unwrap(), "Hello from the audio tier.");
    }

    #[test]
    fn test_parse_transcript_json_rejects_garbage() {
        assert!(parse_transcript_json("<html>").is_err());
    }
}
