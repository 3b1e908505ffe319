//! chunkstash CLI
//!
//! Stores directory trees as encrypted chunks in a pluggable chunk store
//! and restores them later from a JSON-lines index file.
//!
//! # Commands
//! - `store` - Store a file or directory tree
//! - `fetch` - Restore indexed files by path prefix
//! - `list` - List indexed files
//! - `config` - Show or initialize configuration
//!
//! # Configuration
//! Config file: ~/.chunkstash/config.toml
//! Environment: CHUNKSTASH_ROOT, CHUNKSTASH_INDEX, CHUNKSTASH_CIPHER,
//! CHUNKSTASH_PASSPHRASE

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod index;

use chunkstash_backends::DirBackend;
use chunkstash_core::{ChunkStore, EncryptionConfig, EncryptionKey, EngineConfig};
use commands::{fetch, list, store};

/// Application salt for passphrase key derivation; fixed so store and
/// fetch derive the same key across runs
const KEY_SALT: &[u8] = b"chunkstash-key-derivation-v1";

#[derive(Parser)]
#[command(name = "chunkstash")]
#[command(about = "Chunked, encrypted file stash")]
#[command(version)]
struct Cli {
    /// Chunk storage directory (overrides config file)
    #[arg(long, global = true, env = "CHUNKSTASH_ROOT")]
    root: Option<String>,

    /// Index file path (overrides config file)
    #[arg(long, global = true, env = "CHUNKSTASH_INDEX")]
    index: Option<String>,

    /// Encryption passphrase; omit to store plaintext
    #[arg(long, global = true, env = "CHUNKSTASH_PASSPHRASE")]
    passphrase: Option<String>,

    /// Cipher suite: aes-256-gcm or chacha20-poly1305
    #[arg(long, global = true, env = "CHUNKSTASH_CIPHER")]
    cipher: Option<String>,

    /// Maximum concurrent chunk operations
    #[arg(long, global = true)]
    connections: Option<usize>,

    /// Bytes per chunk
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file or directory tree
    Store {
        /// Path to file or directory
        path: String,
    },

    /// Restore indexed files by path prefix
    Fetch {
        /// Path prefix (empty fetches everything)
        #[arg(default_value = "")]
        prefix: String,
    },

    /// List indexed files
    List {
        /// Filter by path prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    // CLI args override config file
    let cfg = config::load_config();
    let root = cli.root.unwrap_or(cfg.storage.root);
    let index_path = PathBuf::from(cli.index.unwrap_or(cfg.index.path));
    let cipher = cli.cipher.unwrap_or(cfg.encryption.cipher);

    match cli.command {
        Commands::Store { path } => {
            let engine = build_engine(
                &root,
                cli.passphrase.as_deref(),
                &cipher,
                cli.connections,
                cli.chunk_size,
            )?;
            engine.ready().await?;
            store::run(&engine, &index_path, store::StoreConfig { path }).await?;
        }

        Commands::Fetch { prefix } => {
            let engine = build_engine(
                &root,
                cli.passphrase.as_deref(),
                &cipher,
                cli.connections,
                cli.chunk_size,
            )?;
            engine.ready().await?;
            fetch::run(&engine, &index_path, fetch::FetchConfig { prefix }).await?;
        }

        Commands::List { prefix } => {
            list::run(&index_path, list::ListConfig { prefix })?;
        }

        Commands::Config { command } => {
            handle_config_command(command)?;
        }
    }

    Ok(())
}

/// Build the engine from resolved settings
fn build_engine(
    root: &str,
    passphrase: Option<&str>,
    cipher: &str,
    connections: Option<usize>,
    chunk_size: Option<usize>,
) -> Result<ChunkStore<DirBackend>> {
    let mut engine_config = EngineConfig::new();
    if let Some(connections) = connections {
        engine_config = engine_config.with_connections(connections);
    }
    if let Some(chunk_size) = chunk_size {
        engine_config = engine_config.with_chunk_size(chunk_size);
    }
    if let Some(passphrase) = passphrase {
        let algorithm = cipher.parse()?;
        let key = EncryptionKey::derive_from_passphrase(passphrase.as_bytes(), KEY_SALT)?;
        engine_config = engine_config.with_encryption(EncryptionConfig::new(algorithm, key));
    }

    let engine = ChunkStore::with_config(DirBackend::new(root), engine_config)?;
    Ok(engine)
}

/// Handle config subcommands
fn handle_config_command(command: Option<ConfigCommands>) -> Result<()> {
    use console::style;

    match command {
        None | Some(ConfigCommands::Show) => {
            let cfg = config::load_config();
            println!();
            println!("{}", style("chunkstash Configuration").bold().underlined());
            println!();
            println!("{}", style("[storage]").cyan());
            println!("  root = \"{}\"", cfg.storage.root);
            println!();
            println!("{}", style("[index]").cyan());
            println!("  path = \"{}\"", cfg.index.path);
            println!();
            println!("{}", style("[encryption]").cyan());
            println!("  cipher = \"{}\"", cfg.encryption.cipher);
            println!();

            if let Ok(path) = config::config_file_path() {
                println!("{} {}", style("Config file:").dim(), path.display());
                if !path.exists() {
                    println!(
                        "{} Run '{}' to create it",
                        style("(not created yet)").yellow(),
                        style("chunkstash config init").green()
                    );
                }
            }
        }

        Some(ConfigCommands::Path) => {
            if let Ok(path) = config::config_file_path() {
                println!("{}", path.display());
            }
        }

        Some(ConfigCommands::Init { force }) => {
            let path = config::config_file_path()?;
            if path.exists() && !force {
                println!(
                    "{} Config file already exists at {}",
                    style("!").yellow(),
                    path.display()
                );
                println!("Use --force to overwrite");
                return Ok(());
            }

            config::save_config(&config::StashConfig::default())?;
            println!("{} Config file created at {}", style("+").green(), path.display());
        }
    }

    Ok(())
}
