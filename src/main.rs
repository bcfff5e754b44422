use clap::Parser;
use fibload::utils::logger;
use fibload::{run_primary, run_worker, CliConfig, Role, Settings};
use tracing::Instrument;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let settings = match Settings::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    };

    logger::init_logger(settings.verbose, settings.json_logs);
    tracing::debug!("Resolved settings: {:?}", settings);

    match cli.role {
        Role::Primary => {
            let args = std::env::args_os().skip(1).collect();
            let report = run_primary(settings, args).await?;
            tracing::info!(
                "primary done: {} workers started, {} exits observed",
                report.spawned,
                report.exits
            );
        }
        Role::Worker => {
            let id = cli.worker_id.unwrap_or_default();
            run_worker(settings)
                .instrument(tracing::info_span!("worker", id))
                .await?;
        }
        Role::Standalone => {
            run_worker(settings).await?;
        }
    }

    Ok(())
}
