mod archive;
mod cli;
mod converter;
mod epub_reader;
mod markdown;
mod pipeline;
mod server;

use anyhow::Result;
use clap::Parser;
use cli::Command;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            max_upload_mb,
            work_dir,
        } => {
            let state = server::AppState { work_root: work_dir };
            server::serve(bind, state, cli::max_upload_bytes(max_upload_mb)).await
        }
        Command::Convert {
            input,
            output,
            work_dir,
        } => tokio::task::spawn_blocking(move || {
            pipeline::convert_file(&input, output.as_deref(), work_dir.as_deref())
        })
        .await?,
    }
}
