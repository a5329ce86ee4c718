use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcript-fetch",
    about = "Fetch YouTube transcripts through an ordered fallback chain",
    version,
    long_about = "Tries the official YouTube captions API, then unofficial caption tracks, then AWS Transcribe on the downloaded audio. Stops at the first transcript; otherwise reports why every tier failed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the transcript of a video
    Fetch {
        /// YouTube URL or 11-character video ID
        #[arg(value_name = "URL_OR_ID")]
        input: String,

        /// Output file or directory (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (defaults to app.default_output_format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// YouTube Data API key for the official captions tier
        #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// OAuth access token used to download official captions
        #[arg(long, env = "YOUTUBE_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// Skip audio transcription for content longer than this many seconds
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        max_duration: Option<u64>,

        /// Preferred caption language (repeatable, in order of preference)
        #[arg(short, long = "language", value_name = "LANG")]
        languages: Vec<String>,
    },

    /// Show or locate the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List the transcript tiers in the order they are tried
    Tiers,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain transcript text
    Text,
    /// JSON report with method and diagnostics
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_arguments_parse() {
        let cli = Cli::try_parse_from([
            "transcript-fetch",
            "fetch",
            "dQw4w9WgXcQ",
            "--format",
            "json",
            "--max-duration",
            "900",
            "-l",
            "de",
            "-l",
            "en",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch { input, format, max_duration, languages, .. } => {
                assert_eq!(input, "dQw4w9WgXcQ");
                assert!(matches!(format, Some(OutputFormat::Json)));
                assert_eq!(max_duration, Some(900));
                assert_eq!(languages, vec!["de", "en"]);
            }
            _ => panic!("expected fetch command"),
        }
    }

    #[test]
    fn test_zero_max_duration_rejected() {
        let parsed = Cli::try_parse_from([
            "transcript-fetch",
            "fetch",
            "dQw4w9WgXcQ",
            "--max-duration",
            "0",
        ]);
        assert!(parsed.is_err());
    }
}
