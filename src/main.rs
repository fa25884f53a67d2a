use log::info;
use milestoner::MilestoneRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runner = MilestoneRunner::new()?;
    let summary = runner.run().await;

    info!(
        "Done: {} created, {} closed, {} failed across {} repositories",
        summary.created(),
        summary.closed(),
        summary.failures(),
        summary.repositories.len()
    );

    Ok(())
}
