// src/main.rs

use gatsby_helper::{cli, logging, run};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("gatsby-helper error: {err:?}");
            1
        }
    };
    // A read blocked on stdin would otherwise hold up runtime shutdown.
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
