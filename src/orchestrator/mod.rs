use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::format_duration;
use crate::{Result, TranscriptorError};

pub mod progress;

pub use progress::{NoProgress, ProgressSink, SpinnerProgress, Stage};

/// Label reported as the method of a result when no tier produced a transcript
pub const ALL_METHODS_FAILED: &str = "All methods failed";

pub const NO_CREDENTIALS_REASON: &str = "no credentials provided";
pub const DURATION_SKIP_REASON: &str = "skipped: duration exceeds threshold";
pub const EMPTY_TRANSCRIPT_REASON: &str = "strategy returned an empty transcript";

/// Diagnostic source used when the identifier itself is rejected
pub const INPUT_DIAGNOSTIC: &str = "ContentIdentifier";

/// Priority order of the tiers
pub const TIER_ORDER: [StrategyName; 3] = [
    StrategyName::OfficialApi,
    StrategyName::UnofficialLibrary,
    StrategyName::AudioTranscription,
];

/// Duration assumed when the duration lookup fails, so the audio tier is still attempted
pub const FALLBACK_DURATION_SECS: u64 = 0;

/// Opaque identifier of a content item on the video platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty and free of whitespace or control characters
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(|c| c.is_whitespace() || c.is_control())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Credentials for the official captions API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    access_token: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Build credentials from optional parts; a missing or blank API key yields `None`
    pub fn from_parts(api_key: Option<String>, access_token: Option<String>) -> Option<Self> {
        let api_key = api_key.filter(|key| !key.trim().is_empty())?;
        let mut credentials = Self::new(api_key.trim());
        if let Some(token) = access_token.filter(|t| !t.trim().is_empty()) {
            credentials = credentials.with_access_token(token.trim());
        }
        Some(credentials)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Which tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyName {
    #[serde(rename = "OfficialAPI")]
    OfficialApi,
    UnofficialLibrary,
    AudioTranscription,
    AllFailed,
}

impl StrategyName {
    /// Stable tag used in diagnostics and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyName::OfficialApi => "OfficialAPI",
            StrategyName::UnofficialLibrary => "UnofficialLibrary",
            StrategyName::AudioTranscription => "AudioTranscription",
            StrategyName::AllFailed => "AllFailed",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            StrategyName::OfficialApi => "Official API",
            StrategyName::UnofficialLibrary => "Unofficial Library",
            StrategyName::AudioTranscription => "Audio Transcription",
            StrategyName::AllFailed => ALL_METHODS_FAILED,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "OfficialAPI" => Some(StrategyName::OfficialApi),
            "UnofficialLibrary" => Some(StrategyName::UnofficialLibrary),
            "AudioTranscription" => Some(StrategyName::AudioTranscription),
            "AllFailed" => Some(StrategyName::AllFailed),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a tier did not produce a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub strategy_name: String,
    pub reason: String,
}

impl DiagnosticEntry {
    pub fn new(strategy: StrategyName, reason: impl Into<String>) -> Self {
        Self {
            strategy_name: strategy.as_str().to_string(),
            reason: reason.into(),
        }
    }

    fn invalid_input(content_id: &ContentId) -> Self {
        Self {
            strategy_name: INPUT_DIAGNOSTIC.to_string(),
            reason: TranscriptorError::InvalidContentId(content_id.as_str().to_string())
                .to_string(),
        }
    }

    pub fn strategy(&self) -> Option<StrategyName> {
        StrategyName::from_tag(&self.strategy_name)
    }
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy() {
            Some(strategy) => write!(f, "{}: {}", strategy.label(), self.reason),
            None => write!(f, "{}: {}", self.strategy_name, self.reason),
        }
    }
}

/// Content longer than the threshold never reaches the audio transcription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationPolicy {
    pub max_duration_secs: u64,
}

impl DurationPolicy {
    pub fn new(max_duration_secs: u64) -> Self {
        Self { max_duration_secs }
    }

    pub fn allows(&self, duration_secs: u64) -> bool {
        duration_secs <= self.max_duration_secs
    }
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self::new(600)
    }
}

/// Outcome of a single `fetch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscriptResult {
    Success {
        text: String,
        method: StrategyName,
        /// Diagnostics from tiers tried before the successful one
        reasons: Vec<DiagnosticEntry>,
    },
    Failure {
        reasons: Vec<DiagnosticEntry>,
    },
}

impl TranscriptResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptResult::Success { .. })
    }

    pub fn method(&self) -> StrategyName {
        match self {
            TranscriptResult::Success { method, .. } => *method,
            TranscriptResult::Failure { .. } => StrategyName::AllFailed,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            TranscriptResult::Success { text, .. } => Some(text),
            TranscriptResult::Failure { .. } => None,
        }
    }

    pub fn reasons(&self) -> &[DiagnosticEntry] {
        match self {
            TranscriptResult::Success { reasons, .. } | TranscriptResult::Failure { reasons } => {
                reasons
            }
        }
    }
}

/// A single way of obtaining a transcript
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    /// Try to produce transcript text; the error becomes the tier's diagnostic reason
    async fn attempt(&self, content_id: &ContentId, credentials: Option<Credentials>)
        -> Result<String>;
}

/// Source of content duration, consulted before the audio transcription tier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurationLookup: Send + Sync {
    async fn duration_secs(&self, content_id: &ContentId) -> Result<u64>;
}

struct Tier {
    name: StrategyName,
    strategy: Box<dyn TranscriptStrategy>,
}

/// Runs the tiers in priority order and stops at the first transcript
pub struct TranscriptOrchestrator {
    tiers: Vec<Tier>,
    duration_lookup: Box<dyn DurationLookup>,
    policy: DurationPolicy,
    progress: Box<dyn ProgressSink>,
}

impl TranscriptOrchestrator {
    /// Tier order is fixed: official API, unofficial library, audio transcription
    pub fn new(
        official: Box<dyn TranscriptStrategy>,
        unofficial: Box<dyn TranscriptStrategy>,
        audio: Box<dyn TranscriptStrategy>,
        duration_lookup: Box<dyn DurationLookup>,
        policy: DurationPolicy,
    ) -> Self {
        let tiers = TIER_ORDER
            .into_iter()
            .zip([official, unofficial, audio])
            .map(|(name, strategy)| Tier { name, strategy })
            .collect();

        Self {
            tiers,
            duration_lookup,
            policy,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn policy(&self) -> DurationPolicy {
        self.policy
    }

    pub fn tier_names(&self) -> Vec<StrategyName> {
        self.tiers.iter().map(|tier| tier.name).collect()
    }

    /// Fetch a transcript, looking up the duration only if the audio tier is reached
    pub async fn fetch(
        &self,
        content_id: &ContentId,
        credentials: Option<&Credentials>,
    ) -> TranscriptResult {
        self.fetch_with_duration(content_id, credentials, None).await
    }

    /// Like [`fetch`](Self::fetch), but a duration already known to the caller skips the lookup
    pub async fn fetch_with_duration(
        &self,
        content_id: &ContentId,
        credentials: Option<&Credentials>,
        known_duration_secs: Option<u64>,
    ) -> TranscriptResult {
        let mut reasons = Vec::new();

        if !content_id.is_valid() {
            tracing::warn!("Rejecting invalid content identifier: {:?}", content_id.as_str());
            reasons.push(DiagnosticEntry::invalid_input(content_id));
            self.progress.report(Stage::Finished, 1.0, ALL_METHODS_FAILED);
            return TranscriptResult::Failure { reasons };
        }

        self.progress
            .report(Stage::Starting, 0.0, &format!("Fetching transcript for {}", content_id));

        let total = self.tiers.len() as f32;
        for (index, tier) in self.tiers.iter().enumerate() {
            let progress = index as f32 / total;

            if let Some(reason) = self
                .skip_reason(tier.name, content_id, credentials, known_duration_secs, progress)
                .await
            {
                tracing::info!("{} skipped for {}: {}", tier.name, content_id, reason);
                reasons.push(DiagnosticEntry::new(tier.name, reason));
                continue;
            }

            self.progress
                .report(Stage::from(tier.name), progress, &format!("Trying {}", tier.name));
            tracing::debug!("Attempting {} for {}", tier.name, content_id);

            match tier.strategy.attempt(content_id, credentials.cloned()).await {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!("Transcript for {} obtained via {}", content_id, tier.name);
                    self.progress.report(
                        Stage::Finished,
                        1.0,
                        &format!("Transcript obtained via {}", tier.name),
                    );
                    return TranscriptResult::Success {
                        text,
                        method: tier.name,
                        reasons,
                    };
                }
                Ok(_) => {
                    tracing::warn!("{} returned an empty transcript for {}", tier.name, content_id);
                    reasons.push(DiagnosticEntry::new(tier.name, EMPTY_TRANSCRIPT_REASON));
                }
                Err(error) => {
                    let reason = format!("{:#}", error);
                    tracing::warn!("{} failed for {}: {}", tier.name, content_id, reason);
                    reasons.push(DiagnosticEntry::new(tier.name, reason));
                }
            }
        }

        self.progress.report(Stage::Finished, 1.0, ALL_METHODS_FAILED);
        TranscriptResult::Failure { reasons }
    }

    async fn skip_reason(
        &self,
        tier: StrategyName,
        content_id: &ContentId,
        credentials: Option<&Credentials>,
        known_duration_secs: Option<u64>,
        progress: f32,
    ) -> Option<&'static str> {
        match tier {
            StrategyName::OfficialApi if credentials.is_none() => Some(NO_CREDENTIALS_REASON),
            StrategyName::AudioTranscription => {
                self.progress.report(Stage::DurationCheck, progress, "Checking content duration");
                let duration = match known_duration_secs {
                    Some(duration) => duration,
                    None => self.lookup_duration(content_id).await,
                };
                tracing::debug!(
                    "Duration of {} is {} (threshold {})",
                    content_id,
                    format_duration(duration),
                    format_duration(self.policy.max_duration_secs)
                );
                (!self.policy.allows(duration)).then_some(DURATION_SKIP_REASON)
            }
            _ => None,
        }
    }

    async fn lookup_duration(&self, content_id: &ContentId) -> u64 {
        match self.duration_lookup.duration_secs(content_id).await {
            Ok(duration) => duration,
            Err(error) => {
                tracing::warn!(
                    "Duration lookup failed for {} ({:#}); assuming {}s and attempting audio transcription",
                    content_id,
                    error,
                    FALLBACK_DURATION_SECS
                );
                FALLBACK_DURATION_SECS
            }
        }
    }
}
