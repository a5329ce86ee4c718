use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::StrategyName;

/// Checkpoints reported while a transcript is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Starting,
    OfficialApi,
    UnofficialLibrary,
    DurationCheck,
    AudioTranscription,
    Finished,
}

impl From<StrategyName> for Stage {
    fn from(name: StrategyName) -> Self {
        match name {
            StrategyName::OfficialApi => Stage::OfficialApi,
            StrategyName::UnofficialLibrary => Stage::UnofficialLibrary,
            StrategyName::AudioTranscription => Stage::AudioTranscription,
            StrategyName::AllFailed => Stage::Finished,
        }
    }
}

/// Receives progress updates synchronously; `progress` is in `0.0..=1.0`
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: Stage, progress: f32, message: &str);
}

/// Discards every update
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stage: Stage, _progress: f32, _message: &str) {}
}

/// Terminal spinner driven by orchestrator checkpoints
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for SpinnerProgress {
    fn report(&self, stage: Stage, progress: f32, message: &str) {
        self.bar.set_position((progress.clamp(0.0, 1.0) * 100.0) as u64);

        if stage == Stage::Finished {
            self.bar.finish_and_clear();
        } else {
            self.bar.set_message(message.to_string());
        }
    }
}
