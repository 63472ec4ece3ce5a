mod cmd;

use clap::{CommandFactory, Parser};
use cmd::config::{Effective, ReduceArgs};

#[derive(Parser)]
#[command(
    name = "mcap-reduce",
    about = "Прореживание высокочастотных каналов в MCAP записях"
)]
struct Cli {
    #[command(flatten)]
    args: ReduceArgs,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if eff.inputs.is_empty() {
        eprintln!("{}", Cli::command().render_usage());
        std::process::exit(1);
    }

    // per-file failures are logged by the batch, they do not change the exit code
    cmd::reduce::run(&eff).await;
}
