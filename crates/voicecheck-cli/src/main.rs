mod analyze;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "voicecheck", about = "Voice note emotion/stress analysis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an audio file
    Analyze {
        /// Audio file (.wav, .mp3, .m4a, .aac, .3gp, .ogg, ...)
        file: PathBuf,

        /// Proxy base URL (overrides config)
        #[arg(long)]
        proxy: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the proxy endpoints that would be tried, in order
    Candidates {
        /// Proxy base URL (overrides config)
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Show the effective configuration
    Health,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = voicecheck_config::load_config()?;

    match cli.command {
        Commands::Analyze { file, proxy, json } => {
            if let Some(proxy) = proxy {
                config.analysis.proxy_url = proxy;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(analyze::run_analyze(config.analysis, file, json))?;
        }
        Commands::Candidates { proxy } => {
            if let Some(proxy) = proxy {
                config.analysis.proxy_url = proxy;
            }
            for candidate in voicecheck_analysis::endpoints::resolve(&config.analysis) {
                let tag = if candidate.is_primary {
                    " (primary)"
                } else if candidate.is_derived {
                    " (loopback sibling)"
                } else {
                    ""
                };
                println!("{}{tag}", candidate.url);
            }
        }
        Commands::Health => {
            let analysis = &config.analysis;
            let mode = if analysis.has_proxy() {
                "proxy"
            } else if analysis.has_generation() {
                "remote generation"
            } else {
                "local heuristic only"
            };
            println!("voicecheck is healthy");
            println!("  mode: {mode}");
            println!(
                "  retry: {} attempts, {} ms base delay",
                analysis.retry.max_attempts, analysis.retry.base_delay_ms
            );
            println!("  request timeout: {}s", analysis.request_timeout_secs);
            match analysis.overall_timeout_secs {
                Some(secs) => println!("  overall timeout: {secs}s"),
                None => println!("  overall timeout: none"),
            }
        }
    }

    Ok(())
}
