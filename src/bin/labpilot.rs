// src/bin/labpilot.rs

use labpilot::{admin, cli};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("labpilot error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    admin(cli::parse_admin()).await
}
