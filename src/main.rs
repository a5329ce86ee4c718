use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_fallback::cli::{Cli, Commands, OutputFormat};
use transcript_fallback::config::Config;
use transcript_fallback::orchestrator::{ContentId, SpinnerProgress, TIER_ORDER};
use transcript_fallback::{output, strategies, utils};

/// Exit status when every tier failed
const EXIT_ALL_FAILED: i32 = 2;

fn init_tracing(verbose: bool, json_logs: bool) {
    let default_filter = if verbose {
        "transcript_fallback=debug"
    } else {
        "transcript_fallback=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Fetch {
            input,
            output,
            format,
            api_key,
            access_token,
            max_duration,
            languages,
        } => {
            let mut config = Config::load().await?;
            config.apply_overrides(api_key, access_token, max_duration, &languages)?;
            let format = format.unwrap_or_else(|| {
                OutputFormat::from_str(&config.app.default_output_format, true)
                    .unwrap_or(OutputFormat::Text)
            });

            // Missing tools only disable tiers, they are not fatal
            let missing_deps = utils::check_dependencies(&config.audio.yt_dlp_path).await;
            for dep in missing_deps {
                tracing::warn!("Dependency not found: {}", dep);
            }

            let content_id = ContentId::new(
                utils::extract_content_id(&input).unwrap_or_else(|| input.trim().to_string()),
            );
            let credentials = config.credentials();

            let mut orchestrator = strategies::build_orchestrator(&config).await?;
            if !cli.quiet {
                orchestrator = orchestrator.with_progress(Box::new(SpinnerProgress::new()));
            }

            tracing::info!("Fetching transcript for: {}", content_id);
            tracing::debug!(
                "Audio transcription limited to {}",
                utils::format_duration(orchestrator.policy().max_duration_secs)
            );
            let result = orchestrator.fetch(&content_id, credentials.as_ref()).await;

            output::print_diagnostics(&result);
            if !result.is_success() {
                if matches!(format, OutputFormat::Json) {
                    output::print_to_console(&content_id, &result, &format)?;
                }
                std::process::exit(EXIT_ALL_FAILED);
            }

            match output {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(format!(
                            "{}.{}",
                            utils::sanitize_filename(content_id.as_str()),
                            format.extension()
                        ))
                    } else {
                        path
                    };
                    output::save_to_file(&content_id, &result, &path, &format).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&content_id, &result, &format)?;
                }
            }
        }
        Commands::Config { show } => {
            if show {
                Config::load().await?.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!(
                    "Edit it to set API keys, languages, the S3 bucket and the duration threshold."
                );
            }
        }
        Commands::Tiers => {
            println!("Transcript tiers, in the order they are tried:");
            for (index, tier) in TIER_ORDER.iter().enumerate() {
                println!(
                    "  {}. {} - {}",
                    index + 1,
                    tier,
                    strategies::tier_prerequisite(*tier)
                );
            }
        }
    }

    Ok(())
}
