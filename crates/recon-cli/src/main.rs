use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use recon_core::{line_hash, LocalIssue};
use recon_engine::{Session, ThreadGuard};
use recon_vcs_git::GitSnapshotProvider;

#[derive(Parser)]
#[command(
    name = "recon",
    version,
    about = "Reconcile local analysis findings with a server's issue history"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize recon in the current repo (creates .recon/recon.toml)
    Init {
        /// Server project key; omit for standalone mode
        #[arg(long)]
        project_key: Option<String>,
        #[arg(long)]
        server_url: Option<String>,
    },

    /// Validate the repo and server connection
    Doctor,

    /// Print the server branch the current HEAD corresponds to
    Branch,

    /// Print the local directory matching the server project root for a file
    Root {
        file: String,
    },

    /// Look up a local issue on the server
    FindIssue {
        #[arg(long)]
        rule: String,
        /// File the issue was raised on; omit for a module-level issue
        #[arg(long)]
        file: Option<String>,
        /// Line the issue starts on; only meaningful together with a file
        #[arg(long, requires = "file")]
        line: Option<u32>,
        /// Column, for analyzers that report whole-file issues at 1:1
        #[arg(long, requires = "line")]
        column: Option<u32>,
        #[arg(long, conflicts_with = "line_text")]
        hash: Option<String>,
        /// Source text of the issue line; hashed locally
        #[arg(long)]
        line_text: Option<String>,
    },
}

fn absolute(repo_root: &Path, file: &str) -> PathBuf {
    let p = PathBuf::from(shellexpand::tilde(file).as_ref());
    if p.is_absolute() {
        p
    } else {
        repo_root.join(p)
    }
}

fn path_str(p: &Path) -> Result<String> {
    p.to_str().map(str::to_string).with_context(|| format!("non-UTF-8 path {}", p.display()))
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;
    let guard = ThreadGuard::current_is_primary();

    match cli.cmd {
        Command::Init { project_key, server_url } => {
            let path =
                Session::init_repo(&repo_root, project_key.as_deref(), server_url.as_deref())?;
            println!("Initialized recon in {}", path.display());
        }
        Command::Doctor => {
            let session = Session::open(repo_root, Box::new(GitSnapshotProvider::new()))?;
            session.doctor(&cancel_on_ctrl_c()).await?;
            println!("OK");
        }
        Command::Branch => {
            let session = Session::open(repo_root, Box::new(GitSnapshotProvider::new()))?;
            match session.refresh_branch(&cancel_on_ctrl_c()).await? {
                Some(branch) => println!("{branch}"),
                None => println!("(no server branch)"),
            }
        }
        Command::Root { file } => {
            let session = Session::open(repo_root.clone(), Box::new(GitSnapshotProvider::new()))?;
            let cancel = cancel_on_ctrl_c();
            session.refresh_branch(&cancel).await?;
            let file = path_str(&absolute(&repo_root, &file))?;
            match session.root_calculator().calculate_root(&file, &cancel).await? {
                Some(root) => println!("{root}"),
                None => println!("(no project root)"),
            }
        }
        Command::FindIssue { rule, file, line, column, hash, line_text } => {
            let session = Session::open(repo_root.clone(), Box::new(GitSnapshotProvider::new()))?;
            let cancel = cancel_on_ctrl_c();
            session.refresh_branch(&cancel).await?;

            let hash = hash.or_else(|| line_text.as_deref().map(line_hash));
            let file = file.map(|f| path_str(&absolute(&repo_root, &f))).transpose()?;
            let local = match (file, line, column) {
                (Some(file), Some(line), Some(column)) => {
                    LocalIssue::from_position(rule, file, line, column, hash)
                }
                (file, line, _) => LocalIssue::new(rule, file, line, hash),
            };

            // lookups must stay off the main thread
            let finder = session.issue_finder(guard);
            let found = tokio::spawn(async move { finder.find_server_issue(&local, &cancel).await })
                .await
                .context("issue lookup task")??;
            match found {
                Some(issue) => println!("{}", serde_json::to_string_pretty(&issue)?),
                None => println!("(no matching server issue)"),
            }
        }
    }

    Ok(())
}
