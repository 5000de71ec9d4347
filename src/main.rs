//! Command line interface for browsing documents hosted in a Matrix room.
//! Supports fetching the page a user posted, resolving room aliases, and
//! searching the public room directory.

mod client;
mod config;
mod event;
mod resolver;

use std::{fs, path::Path};

use anyhow::bail;
use clap::{Parser, Subcommand};
use config::Settings;

/// Command line interface entry point.
#[derive(Parser)]
#[command(
    name = "mxpage",
    author,
    version,
    about = "Browse documents hosted as messages in a Matrix room"
)]
struct Cli {
    /// Path to the `.env` configuration file.
    #[arg(long, default_value = ".env")]
    env: String,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest document a user posted in the default room.
    Fetch {
        /// User identifier, e.g. `@alice:matrix.org` or any fragment of it.
        identifier: String,
        /// Print the whole payload as JSON instead of the bare content.
        #[arg(long)]
        json: bool,
    },
    /// Resolve a room alias to its room id.
    Resolve {
        /// Alias to resolve; defaults to the configured room.
        alias: Option<String>,
    },
    /// Search the public room directory by name or topic.
    Search {
        /// Free-text query matched case-insensitively.
        query: String,
    },
}

/// Execute the selected CLI subcommand.
async fn run(cli: Cli) -> anyhow::Result<()> {
    ensure_env_file(&cli.env)?;
    let cfg = Settings::from_env(&cli.env)?;
    match cli.command {
        Commands::Fetch { identifier, json } => {
            let mut browser = resolver::Browser::new(cfg);
            match browser.fetch(&identifier).await {
                Some(payload) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&payload)?);
                    } else {
                        println!("{}", payload.content);
                    }
                }
                // Absence and transport failure surface identically here.
                None => bail!("no content found for {identifier}"),
            }
        }
        Commands::Resolve { alias } => {
            let client = homeserver(&cfg)?;
            let alias = alias.unwrap_or(cfg.default_room);
            println!("{}", client.resolve_alias(&alias).await?);
        }
        Commands::Search { query } => {
            let client = homeserver(&cfg)?;
            for room in client.search_rooms(&query).await? {
                println!("{room}");
            }
        }
    }
    Ok(())
}

fn homeserver(cfg: &Settings) -> anyhow::Result<client::Homeserver> {
    client::Homeserver::new(&cfg.homeserver, cfg.access_token.clone(), cfg.http_timeout)
}

/// Create a default `.env` file if one is not already present at `path`.
fn ensure_env_file(path: &str) -> anyhow::Result<()> {
    let env_path = Path::new(path);
    if env_path.exists() {
        return Ok(());
    }
    if let Some(parent) = env_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut content = String::new();
    content.push_str("HOMESERVER_URL=https://matrix.org\n");
    content.push_str("DEFAULT_ROOM=#matrix-internet:matrix.org\n");
    content.push_str("ACCESS_TOKEN=\n");
    content.push_str("TIMELINE_ORDER=newest-first\n");
    content.push_str("TIMELINE_LIMIT=50\n");
    content.push_str("HTTP_TIMEOUT_SECS=\n");
    fs::write(env_path, content)?;
    Ok(())
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn env_file_written_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        ensure_env_file(path.to_str().unwrap()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("HOMESERVER_URL=https://matrix.org"));
        assert!(content.contains("DEFAULT_ROOM=#matrix-internet:matrix.org"));
        assert!(content.contains("TIMELINE_ORDER=newest-first"));
    }

    #[test]
    fn existing_env_file_is_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "HOMESERVER_URL=http://localhost\n").unwrap();
        ensure_env_file(path.to_str().unwrap()).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "HOMESERVER_URL=http://localhost\n"
        );
    }

    #[test]
    fn env_file_parent_dirs_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/conf/.env");
        ensure_env_file(path.to_str().unwrap()).unwrap();
        assert!(path.exists());
    }
}
