//! sdfs: browse a host directory through the sandboxed filesystem facade.
//!
//! The binary runs both halves in one process: a `Service` over a
//! `LocalBackend` rooted at `--root`, and a `FileSystem` talking to it over an
//! in-process link. Output is JSON on stdout; logs go to stderr.
//!
//! ```bash
//! sdfs --root /media/card ls /DCIM
//! sdfs --root /media/card stat /DCIM/img.jpg
//! sdfs --root /media/card cp /DCIM/img.jpg /backup --name copy.jpg
//! sdfs --root /media/card mkdir /backup/2024
//! sdfs --root /media/card rm --recursive /backup
//! sdfs --root /media/card --read-only rm /DCIM/img.jpg   # NoModificationAllowedError
//! ```

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use sdfs_backend::{LocalBackend, Service};
use sdfs_client::constants::DEFAULT_FS_NAME;
use sdfs_client::{DirectoryEntry, Entry, EntryFlags, FileSystem};
use sdfs_types::{ErrorName, link, path};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Overrides};

/// Sandboxed filesystem over a local directory.
#[derive(Parser, Debug)]
#[command(name = "sdfs", version)]
#[command(about = "Browse and modify a directory through the sdfs facade")]
struct Args {
    /// Config file (default: ~/.config/sdfs/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host directory mounted as `/` (default: working directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Filesystem display name
    #[arg(long)]
    name: Option<String>,

    /// Refuse every modification
    #[arg(long)]
    read_only: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show size and modification time
    Stat { path: String },
    /// Copy an entry into a directory
    Cp {
        path: String,
        parent: String,
        /// Name at the destination (default: keep the source name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Move a file into a directory
    Mv {
        path: String,
        parent: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove a file, or a directory with --recursive
    Rm {
        path: String,
        /// Remove a directory and everything in it
        #[arg(short, long)]
        recursive: bool,
    },
    /// Create an empty file
    Touch {
        path: String,
        /// Fail if the file already exists
        #[arg(long)]
        exclusive: bool,
    },
    /// Create a directory
    Mkdir {
        path: String,
        #[arg(long)]
        exclusive: bool,
    },
    /// Print the containing directory
    Parent { path: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config.merge(Overrides {
            name: args.name.clone(),
            root: args.root.clone(),
            read_only: args.read_only,
            log: args.log.clone(),
        }),
        Err(e) => {
            eprintln!("sdfs: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.as_deref().unwrap_or("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(config, args.command).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, command: Command) -> Result<Value> {
    let root = config.root_or_cwd()?;
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    let backend = if config.read_only {
        LocalBackend::read_only(&root)
    } else {
        LocalBackend::new(&root)
    };
    tracing::info!(root = %backend.root().display(), read_only = config.read_only, "mounting");

    let (client, server) = link::pair();
    let service = Service::new(Arc::new(backend)).spawn(server);
    let fs = FileSystem::connect(client, config.name.as_deref().unwrap_or(DEFAULT_FS_NAME));

    let output = execute(&fs, command).await;

    let outstanding = fs.shutdown();
    if outstanding > 0 {
        tracing::warn!(outstanding, "requests still in flight at exit");
    }
    service.abort();
    output
}

async fn execute(fs: &FileSystem, command: Command) -> Result<Value> {
    match command {
        Command::Ls { path } => {
            let dir = resolve_dir(fs, &path).await?;
            let entries = dir.entries().await?;
            Ok(Value::Array(entries.iter().map(describe).collect()))
        }
        Command::Stat { path } => {
            let meta = resolve(fs, &path).await?.metadata().await?;
            // Seconds from the epoch; negative for older files.
            let mtime = match meta.modification_time().duration_since(UNIX_EPOCH) {
                Ok(after) => after.as_secs() as i64,
                Err(e) => -(e.duration().as_secs() as i64),
            };
            Ok(json!({ "path": path::normalize(&path), "size": meta.size(), "modified": mtime }))
        }
        Command::Cp { path, parent, name } => {
            let source = resolve(fs, &path).await?;
            let parent = resolve_dir(fs, &parent).await?;
            let copied = match &source {
                Entry::File(file) => file.copy(&parent, name.as_deref()).await?,
                Entry::Directory(dir) => dir.copy(&parent, name.as_deref()).await?,
            };
            Ok(describe(&copied))
        }
        Command::Mv { path, parent, name } => {
            let source = resolve(fs, &path).await?;
            let Some(file) = source.as_file() else {
                bail!("{path} is a directory; only files can be moved");
            };
            let parent = resolve_dir(fs, &parent).await?;
            let moved = file.move_into(&parent, name.as_deref()).await?;
            Ok(describe(&moved))
        }
        Command::Rm { path, recursive } => {
            let removed = match resolve(fs, &path).await? {
                Entry::File(file) => {
                    file.delete().await?;
                    file.full_path().to_string()
                }
                Entry::Directory(dir) if recursive => {
                    dir.delete_recursively().await?;
                    dir.full_path().to_string()
                }
                Entry::Directory(_) => bail!("{path} is a directory; pass --recursive"),
            };
            Ok(json!({ "removed": removed }))
        }
        Command::Touch { path, exclusive } => {
            let file = fs.root().file(&path, create_flags(exclusive)).await?;
            Ok(describe(&Entry::from(file)))
        }
        Command::Mkdir { path, exclusive } => {
            let dir = fs.root().directory(&path, create_flags(exclusive)).await?;
            Ok(describe(&Entry::from(dir)))
        }
        Command::Parent { path } => {
            let parent = resolve(fs, &path).await?.parent().await?;
            Ok(describe(&Entry::from(parent)))
        }
    }
}

fn describe(entry: &Entry) -> Value {
    json!({
        "name": entry.name(),
        "path": entry.full_path(),
        "kind": entry.kind().to_string(),
    })
}

fn create_flags(exclusive: bool) -> EntryFlags {
    if exclusive {
        EntryFlags::CREATE_NEW
    } else {
        EntryFlags::CREATE
    }
}

/// Look up a path typed by the user, whichever kind it is.
async fn resolve(fs: &FileSystem, raw: &str) -> Result<Entry> {
    match fs.root().directory(raw, EntryFlags::OPEN).await {
        Ok(dir) => Ok(dir.into()),
        Err(e) if e.kind() == ErrorName::TypeMismatch => {
            Ok(fs.root().file(raw, EntryFlags::OPEN).await?.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn resolve_dir(fs: &FileSystem, raw: &str) -> Result<DirectoryEntry> {
    Ok(fs.root().directory(raw, EntryFlags::OPEN).await?)
}
