use clap::Parser;
use fibload::utils::logger;
use fibload::{run_bench, BenchCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = BenchCli::parse();

    logger::init_logger(cli.verbose, cli.json_logs);
    tracing::info!("🚀 Load client targeting {}", cli.url);

    match run_bench(&cli).await {
        Ok(file_name) => {
            println!("{}/{}", cli.storage.trim_end_matches('/'), file_name);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
