mod auth;
mod config;
mod files;
mod gateway;
mod grades;
mod ipc;
mod models;
mod normalize;
mod resources;
mod schedule;
mod session;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = config::AppConfig::from_env();
    let store = Arc::new(session::SessionStore::open(&config.state_dir)?);
    let gw: Arc<dyn gateway::ApiGateway> = Arc::new(gateway::HttpGateway::new(
        config.api_base_url.clone(),
        Arc::clone(&store),
    ));
    log::info!(
        "campusd ready, backend {} (state in {})",
        config.api_base_url,
        config.state_dir.display()
    );

    let mut state = ipc::AppState::new(config, store, gw);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't address a reply without a parsed id; answer bare.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                stdout.write_all(format!("{}\n", resp).as_bytes()).await?;
                stdout.flush().await?;
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req).await;
        stdout.write_all(format!("{}\n", resp).as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
