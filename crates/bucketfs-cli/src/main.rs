//! Bucketfs CLI - Command line interface for an S3-compatible bucket
//!
//! Usage:
//!   bucketfs ls 'reports\2024'                 # List a directory
//!   bucketfs mkdir 'reports\2025'              # Create a directory marker
//!   bucketfs rmdir --recursive 'reports\2023'  # Delete a subtree
//!   bucketfs put ./q1.csv 'reports\2025\'      # Upload into a directory
//!   bucketfs get 'reports\2025\q1.csv' out.csv # Download a file
//!   bucketfs cat 'notes.txt'                   # Print a file
//!   bucketfs stat 'reports\2025\q1.csv'        # Show metadata as JSON
//!
//! Connection settings come from `--config <file.json>` and/or flags, with
//! `BUCKETFS_*` environment variables as fallbacks. Logging goes to stderr,
//! filtered by `BUCKETFS_LOG` (default `warn`).

use anyhow::{Context, Result, bail};
use bucketfs::{BucketFs, DirectoryNode, FileNode, Node, NodeInfo, StoreConfig};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Bucketfs - Files and directories on an S3-compatible bucket
#[derive(Parser, Debug)]
#[command(name = "bucketfs")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log debug output for every store request
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct ConnectionArgs {
    /// JSON file holding a store configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service endpoint URL
    #[arg(long, env = "BUCKETFS_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Signing region
    #[arg(long, env = "BUCKETFS_REGION", global = true)]
    region: Option<String>,

    /// Bucket name
    #[arg(long, env = "BUCKETFS_BUCKET", global = true)]
    bucket: Option<String>,

    /// Access key id
    #[arg(long, env = "BUCKETFS_ACCESS_KEY_ID", global = true, hide_env_values = true)]
    access_key_id: Option<String>,

    /// Secret access key
    #[arg(long, env = "BUCKETFS_SECRET_ACCESS_KEY", global = true, hide_env_values = true)]
    secret_access_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List directories then files one level below a directory
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Create a directory marker
    Mkdir { path: String },
    /// Delete a directory
    Rmdir {
        path: String,
        /// Delete every key below the directory as well
        #[arg(short, long)]
        recursive: bool,
    },
    /// Upload a local file. A destination ending with `\` is a directory.
    Put { source: PathBuf, destination: String },
    /// Download a file
    Get {
        source: String,
        destination: PathBuf,
        /// Write the change tag next to the destination as `<destination>.etag`
        #[arg(long)]
        etag: bool,
    },
    /// Write a file's content to stdout
    Cat { path: String },
    /// Delete a file
    Rm { path: String },
    /// Print metadata of a file, or of a directory when the path ends with `\`
    Stat { path: String },
}

#[derive(Serialize, Debug)]
struct NodeStat {
    full_name: String,
    kind: &'static str,
    exists: bool,
    last_modified: Option<String>,
    length: Option<u64>,
    etag: Option<String>,
}

impl NodeStat {
    fn of(node: &dyn NodeInfo, length: Option<u64>) -> Self {
        Self {
            full_name: node.full_name(),
            kind: if node.node_type().is_dir() {
                "directory"
            } else {
                "file"
            },
            exists: node.exists(),
            last_modified: node
                .exists()
                .then(|| node.last_modified().to_rfc3339()),
            length,
            etag: node.etag().map(str::to_string),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args.connection)?;
    tracing::debug!(config = %config, "connecting");
    let fs = BucketFs::connect(&config).context("Failed to build store client")?;

    run(&fs, args.command).await
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("BUCKETFS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge the config file (if any) with flags and environment values.
fn load_config(args: &ConnectionArgs) -> Result<StoreConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str::<StoreConfig>(&text)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        }
        None => StoreConfig::new(
            args.bucket
                .clone()
                .context("missing bucket (--bucket or BUCKETFS_BUCKET)")?,
            args.access_key_id
                .clone()
                .context("missing access key id (--access-key-id or BUCKETFS_ACCESS_KEY_ID)")?,
            args.secret_access_key.clone().context(
                "missing secret access key (--secret-access-key or BUCKETFS_SECRET_ACCESS_KEY)",
            )?,
        ),
    };

    if let Some(endpoint) = &args.endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(region) = &args.region {
        config = config.with_region(region);
    }
    if let Some(bucket) = &args.bucket {
        config = config.with_bucket(bucket);
    }
    if args.access_key_id.is_some() || args.secret_access_key.is_some() {
        let access_key_id = args
            .access_key_id
            .clone()
            .unwrap_or_else(|| config.access_key_id().to_string());
        let secret_access_key = args
            .secret_access_key
            .clone()
            .unwrap_or_else(|| config.secret_access_key().to_string());
        config = config.with_credentials(access_key_id, secret_access_key);
    }

    config.validate().context("Invalid store configuration")?;
    Ok(config)
}

async fn run(fs: &BucketFs, command: Command) -> Result<()> {
    match command {
        Command::Ls { path } => {
            let directory = DirectoryNode::new(fs.store(), &path)?;
            for item in directory.list_items().await? {
                println!("{}", format_item(&item));
            }
        }
        Command::Mkdir { path } => {
            let mut directory = fs.directory(&path).await?;
            directory.create().await?;
        }
        Command::Rmdir { path, recursive } => {
            let mut directory = fs.directory(&path).await?;
            if !directory.exists() && !recursive {
                bail!("directory not found: {}", directory.key());
            }
            directory.delete(recursive).await?;
        }
        Command::Put {
            source,
            destination,
        } => {
            let file = if destination.is_empty() || destination.ends_with('\\') {
                fs.directory(&destination).await?.upload_file(&source).await?
            } else {
                let mut file = FileNode::new(fs.store(), &destination)?;
                file.upload_from_local(&source).await?;
                file
            };
            println!("{} {}", file.length(), file.full_name());
        }
        Command::Get {
            source,
            destination,
            etag,
        } => {
            let file = existing_file(fs, &source).await?;
            let written = file.download_to_local(&destination, etag).await?;
            println!("{} {}", written, destination.display());
        }
        Command::Cat { path } => {
            let file = existing_file(fs, &path).await?;
            let mut reader = file.open_for_reading().await?;
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut reader, &mut stdout).await?;
        }
        Command::Rm { path } => {
            let mut file = existing_file(fs, &path).await?;
            file.delete().await?;
        }
        Command::Stat { path } => {
            let stat = if path.is_empty() || path.ends_with('\\') {
                NodeStat::of(&fs.directory(&path).await?, None)
            } else {
                let file = fs.file(&path).await?;
                NodeStat::of(&file, Some(file.length()))
            };
            println!("{}", serde_json::to_string_pretty(&stat)?);
        }
    }
    Ok(())
}

async fn existing_file(fs: &BucketFs, path: &str) -> Result<FileNode> {
    let file = fs.file(path).await?;
    if !file.exists() {
        bail!("file not found: {}", file.key());
    }
    Ok(file)
}

fn format_item(item: &Node) -> String {
    match item {
        Node::Directory(directory) => format!("{:>12}  {}\\", "DIR", directory.name()),
        Node::File(file) => format!(
            "{:>12}  {}  {}",
            file.length(),
            file.last_modified().format("%Y-%m-%d %H:%M:%S"),
            file.name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv.iter().copied()).unwrap()
    }

    #[test]
    fn test_flags_build_config() {
        let args = parse(&[
            "bucketfs",
            "--bucket",
            "media",
            "--access-key-id",
            "AKIAEXAMPLE",
            "--secret-access-key",
            "secret",
            "--endpoint",
            "http://localhost:9000",
            "--region",
            "eu-central-1",
            "ls",
        ]);
        let config = load_config(&args.connection).unwrap();
        assert_eq!(config.bucket(), "media");
        assert_eq!(config.access_key_id(), "AKIAEXAMPLE");
        assert_eq!(config.endpoint(), "http://localhost:9000");
        assert_eq!(config.region(), "eu-central-1");
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bucket": "from-file", "access_key_id": "id", "secret_access_key": "s", "force_path_style": false}}"#
        )
        .unwrap();

        let config_path = file.path().to_str().unwrap();
        let args = parse(&["bucketfs", "--config", config_path, "--bucket", "from-flag", "ls"]);
        let config = load_config(&args.connection).unwrap();
        assert_eq!(config.bucket(), "from-flag");
        assert!(!config.force_path_style());
    }

    #[test]
    fn test_subcommand_parsing() {
        let args = parse(&["bucketfs", "rmdir", "--recursive", "a\\b"]);
        assert!(matches!(
            args.command,
            Command::Rmdir { ref path, recursive: true } if path == "a\\b"
        ));
    }
}
