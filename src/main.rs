use std::env;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use autelis_bridge::{AutelisBridge, Config};

const MANIFEST_PATH: &str = "nodes.json";

#[tokio::main]
async fn main() -> autelis_bridge::Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    let mut builder = AutelisBridge::builder(&config.controller.host)
        .credentials(&config.controller.username, &config.controller.password)
        .poll_interval(Duration::from_secs(config.settings.poll_interval_secs))
        .persist_interval(Duration::from_secs(config.settings.persist_interval_secs))
        .ignore_solar(config.settings.ignore_solar)
        .on_report(|report| {
            info!(
                address = %report.address,
                driver = report.driver.code(),
                value = report.value,
                "driver report"
            );
        })
        .on_persist(|registry| {
            let manifest: Vec<_> = registry
                .iter()
                .map(|(address, node)| {
                    json!({ "address": address, "kind": node.kind().as_str() })
                })
                .collect();
            match serde_json::to_string_pretty(&manifest) {
                Ok(body) => {
                    if let Err(e) = std::fs::write(MANIFEST_PATH, body) {
                        warn!(path = MANIFEST_PATH, "failed to write node manifest: {e}");
                    }
                }
                Err(e) => warn!("failed to serialize node manifest: {e}"),
            }
        });

    if let Some(ref path) = config.settings.message_log {
        builder = builder.message_log(path);
    }

    let mut bridge = builder.build();

    info!(host = %config.controller.host, "starting autelis bridge");
    bridge.run().await;

    Ok(())
}
