//! Board server command (`taskboard serve`).

use anyhow::Result;

use taskboard::board::server::start_server;
use taskboard::config::TaskboardConfig;

pub async fn cmd_serve(config: &TaskboardConfig, port: Option<u16>, dev: bool) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }
    start_server(config.server_config(port, dev)).await
}
