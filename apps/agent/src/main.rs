use sleepsync_agent::{Agent, AgentConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = AgentConfig::from_env()?;
    let agent = Agent::open(&config)?;

    match config.interval_secs {
        Some(interval) => {
            tokio::select! {
                _ = agent.run_periodic(interval) => {}
                _ = tokio::signal::ctrl_c() => log::info!("[SyncPass] Stopping"),
            }
        }
        None => {
            let report = agent.run_once().await?;
            if report.total_failed() > 0 {
                log::warn!(
                    "[SyncPass] {} row(s) left unsynced for the next pass",
                    report.total_failed()
                );
            }
        }
    }
    Ok(())
}
