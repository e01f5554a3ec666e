// src/main.rs

use taskdag::config::load_and_validate;
use taskdag::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("taskdag error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let cfg = load_and_validate(&args.config)?;
    logging::init_logging(args.log_level, Some(cfg.log_level()))?;
    run(args, cfg).await
}
