use anyhow::{Context, Result};
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::{Credentials, DurationPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Official captions API (tier 1)
    pub official_api: OfficialApiConfig,

    /// Unofficial caption tracks (tier 2)
    pub unofficial: UnofficialConfig,

    /// Audio download and transcription (tier 3)
    pub audio: AudioConfig,

    /// Duration gate for the audio tier
    pub policy: PolicyConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficialApiConfig {
    /// YouTube Data API key; the tier is skipped without one
    pub api_key: Option<String>,

    /// OAuth access token, needed by captions.download for most videos
    pub access_token: Option<String>,

    /// Preferred caption languages, in order
    pub languages: Vec<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnofficialConfig {
    /// Preferred caption languages, in order
    pub languages: Vec<String>,

    /// Pause between consecutive requests, in milliseconds
    pub request_delay_ms: u64,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// yt-dlp executable used for audio download and duration lookup
    pub yt_dlp_path: String,

    /// AWS Transcribe settings
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// S3 bucket for temporary audio storage
    pub s3_bucket: String,

    /// Optional S3 key prefix
    pub s3_key_prefix: Option<String>,

    /// Language code for transcription jobs (auto-detect if not set)
    pub default_language: Option<String>,

    /// Give up on a transcription job after this many seconds
    pub max_poll_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Content longer than this never reaches the audio tier
    pub max_audio_duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            official_api: OfficialApiConfig {
                api_key: None,
                access_token: None,
                languages: vec!["en".to_string()],
                timeout_secs: 30,
            },
            unofficial: UnofficialConfig {
                languages: vec!["en".to_string()],
                request_delay_ms: 500,
                timeout_secs: 30,
            },
            audio: AudioConfig {
                yt_dlp_path: "yt-dlp".to_string(),
                aws: AwsConfig {
                    region: "us-east-1".to_string(),
                    s3_bucket: "".to_string(),
                    s3_key_prefix: Some("transcript-fallback/".to_string()),
                    default_language: None,
                    max_poll_secs: 1800,
                },
            },
            policy: PolicyConfig {
                max_audio_duration_secs: DurationPolicy::default().max_duration_secs,
            },
            app: AppConfig {
                default_output_format: "text".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Parse and validate configuration from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-fallback").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.audio.aws.region.trim().is_empty() {
            anyhow::bail!("AWS region must be configured");
        }

        if self.policy.max_audio_duration_secs == 0 {
            anyhow::bail!("policy.max_audio_duration_secs must be greater than zero");
        }

        if self.official_api.languages.is_empty() || self.unofficial.languages.is_empty() {
            anyhow::bail!("At least one caption language must be configured for each tier");
        }

        Ok(())
    }

    /// Apply command-line overrides on top of the file configuration and re-validate
    pub fn apply_overrides(
        &mut self,
        api_key: Option<String>,
        access_token: Option<String>,
        max_duration: Option<u64>,
        languages: &[String],
    ) -> Result<()> {
        if api_key.is_some() {
            self.official_api.api_key = api_key;
        }
        if access_token.is_some() {
            self.official_api.access_token = access_token;
        }
        if let Some(secs) = max_duration {
            self.policy.max_audio_duration_secs = secs;
        }
        if !languages.is_empty() {
            self.official_api.languages = languages.to_vec();
            self.unofficial.languages = languages.to_vec();
        }

        self.validate()
    }

    /// Credentials for the official API tier, if an API key is configured
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(
            self.official_api.api_key.clone(),
            self.official_api.access_token.clone(),
        )
    }

    pub fn duration_policy(&self) -> DurationPolicy {
        DurationPolicy::new(self.policy.max_audio_duration_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!(
            "  Official API Key: {}",
            if self.credentials().is_some() { "configured" } else { "not set" }
        );
        println!("  Caption Languages: {}", self.unofficial.languages.join(", "));
        println!("  Max Audio Duration: {}s", self.policy.max_audio_duration_secs);
        println!("  yt-dlp: {}", self.audio.yt_dlp_path);
        println!("  AWS Region: {}", self.audio.aws.region);
        if self.audio.aws.s3_bucket.is_empty() {
            println!("  S3 Bucket: not set (audio transcription disabled)");
        } else {
            println!("  S3 Bucket: {}", self.audio.aws.s3_bucket);
        }
        if let Some(prefix) = &self.audio.aws.s3_key_prefix {
            println!("  S3 Prefix: {}", prefix);
        }
        println!("  Default Format: {}", self.app.default_output_format);
    }

    /// Get AWS region
    pub fn aws_region(&self) -> Region {
        Region::new(self.audio.aws.region.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.credentials().is_none());
        assert_eq!(config.duration_policy().max_duration_secs, 600);
    }

    #[test]
    fn test_yaml_round_trip_preserves_settings() {
        let mut config = Config::default();
        config.official_api.api_key = Some("abc".to_string());
        config.audio.aws.s3_bucket = "bucket".to_string();

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = tokio_test::assert_ok!(Config::from_yaml(&yaml));

        assert_eq!(parsed.official_api.api_key.as_deref(), Some("abc"));
        assert_eq!(parsed.audio.aws.s3_bucket, "bucket");
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = Config::default();
        config.policy.max_audio_duration_secs = 0;
        let yaml = serde_yaml::to_string(&config).unwrap();

        tokio_test::assert_err!(Config::from_yaml(&yaml));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::default();
        tokio_test::assert_ok!(config.apply_overrides(
            Some("cli-key".to_string()),
            None,
            Some(120),
            &["de".to_string(), "en".to_string()],
        ));

        assert_eq!(
            config.credentials().map(|c| c.api_key().to_string()),
            Some("cli-key".to_string())
        );
        assert_eq!(config.duration_policy().max_duration_secs, 120);
        assert_eq!(config.unofficial.languages, vec!["de", "en"]);
        assert_eq!(config.official_api.languages, vec!["de", "en"]);
    }

    #[test]
    fn test_zero_threshold_override_rejected() {
        let mut config = Config::default();
        tokio_test::assert_err!(config.apply_overrides(None, None, Some(0), &[]));
    }

    #[test]
    fn test_blank_api_key_means_no_credentials() {
        let mut config = Config::default();
        config.official_api.api_key = Some("   ".to_string());
        assert!(config.credentials().is_none());
    }
}
