//! remote-dl server binary.
//!
//! Usage: `remote-dl [CONFIG]`. The config path may also come from
//! `REMOTE_DL_CONFIG`; without either, defaults are used.

use remote_dl::{Config, DownloadManager, logging, run_with_shutdown};

/// Environment variable naming the config file
const CONFIG_ENV: &str = "REMOTE_DL_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV))
        .map(std::path::PathBuf::from);

    let config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    logging::init_logging(&config.logging);

    match &config_path {
        Some(path) => tracing::info!(path = %path.display(), "Loaded configuration"),
        None => tracing::info!("No configuration file given, using defaults"),
    }

    let manager = DownloadManager::new(config).await?;
    manager.start().await;

    let api = manager.spawn_api_server();
    tokio::select! {
        _ = run_with_shutdown(manager.clone()) => {}
        result = api => {
            // The server only returns on failure; drain before reporting it
            manager.shutdown().await;
            match result {
                Ok(Err(e)) => return Err(e.into()),
                Err(e) => return Err(e.into()),
                Ok(Ok(())) => {}
            }
        }
    }

    Ok(())
}
