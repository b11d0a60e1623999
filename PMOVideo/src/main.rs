mod console;
mod logging;

use std::sync::Arc;

use pmoconfig::get_config;
use pmoplayback::{HeadlessEngine, PlaybackSession, SessionOptions};
use pmovideo::VideoApiClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::console::Command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Configuration ==========
    let config = get_config();
    logging::init_logging(&config);
    info!(config_file = %config.file_path().display(), "🎬 Starting PMOVideo");

    let client = VideoApiClient::configured(&config)?;
    let options = SessionOptions::configured(&config)?;
    info!("📡 Video catalogue at {}", client.base_url());

    // ========== PHASE 2 : Session de lecture ==========
    let autoload = options.autoload;
    let session = PlaybackSession::new(Arc::new(client), Arc::new(HeadlessEngine::new()), options);
    let renderer = tokio::spawn(console::render(session.subscribe()));

    println!("{}", console::HELP);
    if !autoload {
        println!("\nAutoload is disabled, type 'retry' to load the catalogue");
    }

    // ========== PHASE 3 : Boucle console ==========
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if !console::dispatch(&session, command) {
                            break;
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received");
                break;
            }
        }
    }

    session.shutdown();
    renderer.abort();
    info!("👋 PMOVideo stopped");
    Ok(())
}
