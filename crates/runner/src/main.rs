use chmask_runner::{config, logging, metrics, runner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match config::RunnerConfig::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = logging::init(&config.log_path) {
        eprintln!("STARTUP_ERROR {}", err);
        std::process::exit(1);
    }

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(err) => {
            tracing::error!(error = %err, "invalid mask spec");
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    let result = runner::run(&config, registry).await;

    if let Some(path) = &config.metrics_path
        && let Err(err) = metrics::write_textfile(path)
    {
        tracing::warn!(path = %path.display(), error = %err, "failed to write metrics textfile");
    }

    match result {
        Ok(outcome) => {
            if let Some(artifact) = &outcome.artifact {
                println!("{}", artifact.path.display());
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "mask run aborted");
            std::process::exit(1);
        }
    }
}
