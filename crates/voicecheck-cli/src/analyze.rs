use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use voicecheck_analysis::{AnalysisError, StrategyResult, VoiceAnalyzer};
use voicecheck_types::AnalysisConfig;

/// Analyze one audio file and print the result.
pub async fn run_analyze(config: AnalysisConfig, file: PathBuf, as_json: bool) -> Result<()> {
    let analyzer = VoiceAnalyzer::from_config(config).context("Failed to build HTTP transport")?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling analysis");
            on_ctrl_c.cancel();
        }
    });

    let result = match analyzer.analyze_path(&file, &cancel).await {
        Ok(result) => result,
        Err(AnalysisError::Cancelled) => {
            eprintln!("Analysis cancelled");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Cannot analyze {}", file.display()));
        }
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result_json(&result))?);
    } else {
        println!("{}", result.display_text());
        eprintln!("(strategy: {})", result.kind());
    }

    if matches!(result, StrategyResult::AllFailed { .. }) {
        std::process::exit(2);
    }
    Ok(())
}

fn result_json(result: &StrategyResult) -> serde_json::Value {
    let mut value = json!({
        "strategy": result.kind(),
        "remote": result.is_remote(),
        "text": result.display_text(),
    });
    match result {
        StrategyResult::Proxy { endpoint, .. } => {
            value["endpoint"] = json!(endpoint);
        }
        StrategyResult::Local(guess) => {
            value["label"] = json!(guess.label);
        }
        StrategyResult::AllFailed { failures } => {
            value["failures"] = failures
                .iter()
                .map(|f| json!({"target": f.target, "reason": f.reason}))
                .collect();
        }
        StrategyResult::FileReference { .. } | StrategyResult::Inline { .. } => {}
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicecheck_analysis::{StrategyFailure, local_guess};

    #[test]
    fn test_result_json_local() {
        let result = StrategyResult::Local(local_guess("sad.wav", 100_000));
        let value = result_json(&result);
        assert_eq!(value["strategy"], "local");
        assert_eq!(value["remote"], false);
        assert_eq!(value["label"], "Sad / Low energy");
    }

    #[test]
    fn test_result_json_failures() {
        let result = StrategyResult::AllFailed {
            failures: vec![StrategyFailure::new("http://a/analyze", "HTTP 503")],
        };
        let value = result_json(&result);
        assert_eq!(value["failures"][0]["target"], "http://a/analyze");
        assert_eq!(value["failures"][0]["reason"], "HTTP 503");
    }

    #[test]
    fn test_result_json_proxy() {
        let result = StrategyResult::Proxy {
            endpoint: "http://p/analyze".into(),
            text: "Calm".into(),
        };
        let value = result_json(&result);
        assert_eq!(value["remote"], true);
        assert_eq!(value["endpoint"], "http://p/analyze");
        assert_eq!(value["text"], "Calm");
    }
}
