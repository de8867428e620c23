use landwatch::PipelineConfig;
use landwatch_server::{ServerConfig, init_tracing, start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = ServerConfig::from_env()?;
    let handle = start_server(cfg, PipelineConfig::default()).await?;
    // Park until the server task ends.
    handle.await.ok();
    Ok(())
}
