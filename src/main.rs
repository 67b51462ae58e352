use clap::Parser;
use std::path::Path;
use tracing::{error, info};

use activity_server::adapters::{build_state, start_api_server, PostgresStore};
use activity_server::cli::{Cli, Commands, FeatureArgs};
use activity_server::config::AppConfig;
use activity_server::error::{Result, ServerError};
use activity_server::logging::{init_logging, init_logging_simple};
use activity_server::ml::InferenceService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            port,
            model,
            persist_policy,
        } => {
            let mut cfg = load_config(&config)?;
            if let Some(port) = port {
                cfg.server.port = port;
            }
            if let Some(model) = model {
                cfg.model.path = model;
            }
            if let Some(policy) = persist_policy {
                cfg.server.persist_policy = policy;
            }
            cfg.validate().map_err(ServerError::InvalidConfig)?;

            let _guard = init_logging(&cfg.logging);
            if let Err(e) = run_server(cfg).await {
                error!("Server exited with error: {}", e);
                return Err(e);
            }
        }
        Commands::Classify {
            model,
            features,
            json,
        } => {
            init_logging_simple();
            run_classify(&model, &features, json)?;
        }
        Commands::Migrate { config } => {
            let cfg = load_config(&config)?;
            let _guard = init_logging(&cfg.logging);
            let url = cfg.store.url.as_deref().ok_or_else(|| {
                ServerError::InvalidConfig(vec!["store.url is required to migrate".to_string()])
            })?;
            let store = PostgresStore::new(url, cfg.store.max_connections).await?;
            store.migrate().await?;
        }
    }

    Ok(())
}

fn load_config(dir: &Path) -> Result<AppConfig> {
    Ok(AppConfig::load_from(dir)?)
}

async fn run_server(cfg: AppConfig) -> Result<()> {
    info!(
        model = %cfg.model.path.display(),
        backend = ?cfg.store.backend,
        "Starting activity server"
    );

    // A server without a classifier is never started.
    let inference = InferenceService::load(&cfg.model.path)?;
    let state = build_state(&cfg, inference).await?;

    start_api_server(state, &cfg.bind_addr()).await
}

fn run_classify(model: &Path, args: &FeatureArgs, json: bool) -> Result<()> {
    let features = args
        .to_features()
        .map_err(|e| ServerError::Validation(e.to_string()))?;
    let service = InferenceService::load(model)?;
    let result = service.classify(&features)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "features": features.as_array(),
                "predicted_class": [result.class_index],
                "level": result.level(),
                "probabilities": result.probabilities,
            }))?
        );
        return Ok(());
    }

    println!("Predicted class: {} ({})", result.class_index, result.level());
    for (idx, p) in result.probabilities.iter().enumerate() {
        let marker = if idx == result.class_index { "*" } else { " " };
        println!("  {marker} [{idx}] {p:.4}");
    }
    Ok(())
}
