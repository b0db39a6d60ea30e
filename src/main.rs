use clap::Parser;
use confd_aws::config::{LogFormat, OutputFormat};
use confd_aws::core::backend;
use confd_aws::core::{StoreClient, ValueMap, WatchCapability};
use confd_aws::utils::logger;
use confd_aws::CliConfig;
use std::collections::BTreeMap;
use std::time::Duration;

fn render(values: &ValueMap, format: OutputFormat) -> anyhow::Result<String> {
    let sorted: BTreeMap<&String, &String> = values.iter().collect();
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&sorted)?,
        OutputFormat::Env => sorted
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// One fetch. Partial results are still printed when a key fails.
async fn fetch(client: &dyn StoreClient, keys: &[String], format: OutputFormat) -> anyhow::Result<bool> {
    match client.get_values(keys).await {
        Ok(lookup) => {
            for skipped in &lookup.skipped {
                tracing::warn!("Skipped '{}': {:?}", skipped.key, skipped.reason);
            }
            println!("{}", render(&lookup.values, format)?);
            Ok(true)
        }
        Err(e) => {
            tracing::error!("❌ {}", e);
            if !e.partial.is_empty() {
                tracing::warn!("Printing {} values resolved before the failure", e.partial.len());
                println!("{}", render(&e.partial.values, format)?);
            }
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    };
    tracing::debug!("Settings: {:?}", settings);

    let client = match backend::connect(&settings.backend).await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("❌ Backend initialisation failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if settings.interval == 0 {
        if !fetch(client.as_ref(), &settings.keys, cli.output).await? {
            std::process::exit(2);
        }
        return Ok(());
    }

    match client.watch_capability() {
        WatchCapability::LongPollUnsupported => tracing::info!(
            "Backend does not support watches, re-polling every {}s",
            settings.interval
        ),
        _ => {}
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(settings.interval));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                fetch(client.as_ref(), &settings.keys, cli.output).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}
