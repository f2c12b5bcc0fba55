use std::path::PathBuf;

use ::tracing::{error, info_span};
use anyhow::Result;
use artifact_store::{ArtifactRepository, FileInfo, OssArtifactRepository};
use clap::{Parser, Subcommand};

mod config;
mod tracing;
use tracing::setup_tracing;

#[derive(Parser)]
#[command(version, about = "Store and fetch run artifacts in Aliyun OSS", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "config file", help = "Path to config file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Emit logs as JSON")]
    structured_logging: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a single file.
    LogArtifact {
        uri: String,
        file: PathBuf,
        #[arg(long)]
        path: Option<String>,
    },
    /// Upload a directory tree.
    LogArtifacts {
        uri: String,
        dir: PathBuf,
        #[arg(long)]
        path: Option<String>,
    },
    /// List the entries directly under a path.
    Ls { uri: String, path: Option<String> },
    /// Download a file or directory.
    Download {
        uri: String,
        path: String,
        dst: PathBuf,
    },
    /// Delete artifacts under a path.
    Rm { uri: String, path: Option<String> },
}

impl Command {
    fn uri(&self) -> &str {
        match self {
            Command::LogArtifact { uri, .. }
            | Command::LogArtifacts { uri, .. }
            | Command::Ls { uri, .. }
            | Command::Download { uri, .. }
            | Command::Rm { uri, .. } => uri,
        }
    }
}

fn format_entry(info: &FileInfo) -> String {
    match info.file_size {
        Some(size) if !info.is_dir => format!("{:>12}  {}", size, info.path),
        _ => format!("{:>12}  {}/", "dir", info.path),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    let repo = OssArtifactRepository::from_config(cli.command.uri(), &config)?;

    match cli.command {
        Command::LogArtifact { file, path, .. } => {
            repo.log_artifact(&file, path.as_deref()).await?;
        }
        Command::LogArtifacts { dir, path, .. } => {
            repo.log_artifacts(&dir, path.as_deref()).await?;
        }
        Command::Ls { path, .. } => {
            for info in repo.list_artifacts(path.as_deref()).await? {
                println!("{}", format_entry(&info));
            }
        }
        Command::Download { path, dst, .. } => {
            let local = repo.download_artifacts(&path, &dst).await?;
            println!("{}", local.display());
        }
        Command::Rm { path, .. } => {
            repo.delete_artifacts(path.as_deref()).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.structured_logging);

    let root_span = info_span!("oss-artifacts", uri = cli.command.uri());
    let _guard = root_span.enter();

    if let Err(err) = run(cli).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
