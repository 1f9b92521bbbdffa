//! SHL Server binary: loads `server.*` / `SHL_SERVER__*` settings and serves
//! the recommender over HTTP.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    server::start_server(config).await?;
    Ok(())
}
