use anyhow::{Context, Result};
use scandeval_core::TrainingArgs;
use scandeval_workflow::{benchmark_config, write_report, BaselineProvider, Benchmark, ConflictPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{LogFormat, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings);

    tracing::info!(
        models = ?settings.models,
        benchmarks = ?settings.benchmarks,
        "Starting ScandEval"
    );

    let provider = BaselineProvider::new();
    let policy = ConflictPolicy::from_raise_errors(settings.raise_errors);
    let args = settings.training.apply(TrainingArgs::default());

    for name in &settings.benchmarks {
        let benchmark = Benchmark::new(benchmark_config(name)?, args.clone())?
            .with_conflict_policy(policy);

        let (train, test) = benchmark
            .load_data()
            .await
            .with_context(|| format!("Loading the {} dataset", name))?;

        for model_id in &settings.models {
            let report = benchmark
                .evaluate(&provider, model_id, &train, &test)
                .with_context(|| format!("Benchmarking {} on {}", model_id, name))?;

            println!("{}", report.summary_text());

            let paths = write_report(&report, &settings.report_dir, &settings.report_formats).await?;
            tracing::info!(?paths, "Saved report");
        }
    }

    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(&settings.log_level).into());

    match settings.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Filter directives enabling every crate of the workspace at `level`.
fn default_directives(level: &str) -> String {
    ["scandeval", "scandeval_core", "scandeval_metrics", "scandeval_workflow"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_library_crates() {
        assert_eq!(
            default_directives("debug"),
            "scandeval=debug,scandeval_core=debug,scandeval_metrics=debug,scandeval_workflow=debug"
        );
    }
}
