//! andante command-line entry point.
//!
//! Drives the paced, caching dispatcher from the shell and houses the
//! cache housekeeping commands. Logging goes to stderr so fetched bodies
//! can be piped cleanly from stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use andante_client::{Connection, HttpResponse, RequestDescriptor, RequestOptions, RetryLimit};
use andante_core::cache::METADATA_DB;
use andante_core::{AppConfig, CacheStore};

#[derive(Parser)]
#[command(name = "andante", version, about = "Paced, cached, retrying HTTP requests")]
struct Cli {
    /// Log at debug level regardless of RUST_LOG.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a URL through the dispatcher and print the body.
    Fetch {
        url: String,

        /// Send a POST with this body instead of a GET.
        #[arg(long)]
        post: Option<String>,

        /// Skip the cache for this call.
        #[arg(long)]
        no_cache: bool,

        /// Cache lifetime for this call, in seconds.
        #[arg(long)]
        ttl_secs: Option<u64>,

        /// Retry attempts beyond the first; negative for unlimited.
        #[arg(long, allow_negative_numbers = true)]
        max_retries: Option<i64>,

        /// Disambiguator mixed into the cache key.
        #[arg(long)]
        cache_key: Option<String>,

        /// Referer header for this call.
        #[arg(long)]
        referer: Option<String>,

        /// Swallow terminal failures and exit quietly.
        #[arg(long)]
        silent: bool,
    },

    /// Print the default header set.
    Headers {
        /// Include a Referer header.
        #[arg(long)]
        referer: Option<String>,
    },

    /// Delete expired entries from one cache directory.
    Purge {
        /// Cache directory (defaults to the configured one).
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Find and delete cache directories under a root.
    Clear {
        /// Directory to scan for cache directories.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Actually delete; without this, only list what would go.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { EnvFilter::new("debug") } else { EnvFilter::from_default_env() };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Fetch { url, post, no_cache, ttl_secs, max_retries, cache_key, referer, silent } => {
            let options = RequestOptions {
                cache: no_cache.then_some(false),
                cache_ttl: ttl_secs.map(Duration::from_secs),
                cache_key,
                max_retries: max_retries.map(|cap| RetryLimit::from(u32::try_from(cap).ok())),
                referer,
                ..Default::default()
            };
            fetch(&url, post, options, silent).await
        }
        Command::Headers { referer } => headers(referer.as_deref()),
        Command::Purge { dir } => purge(dir).await,
        Command::Clear { root, yes } => clear(&root, yes),
    }
}

async fn fetch(url: &str, post: Option<String>, options: RequestOptions, silent: bool) -> Result<()> {
    let config = AppConfig::load()?;
    let connection = Connection::from_app_config(&config).await?;

    let descriptor = match post {
        Some(body) => RequestDescriptor::post(url, body.into_bytes()),
        None => RequestDescriptor::get(url),
    }
    .with_options(options);

    if silent {
        match connection.send_silent(descriptor).await? {
            Some(response) => print_response(&response),
            None => eprintln!("no response from {url}"),
        }
    } else {
        print_response(&connection.send(descriptor).await?);
    }

    Ok(())
}

fn print_response(response: &HttpResponse) {
    eprintln!("{} {}", response.status, response.reason.as_deref().unwrap_or(""));
    println!("{}", response.text());
}

fn headers(referer: Option<&str>) -> Result<()> {
    let config = AppConfig::load()?;
    for (name, value) in andante_client::headers::default_headers(&config.user_agent, referer) {
        println!("{name}: {value}");
    }
    Ok(())
}

async fn purge(dir: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load()?;
    let dir = dir.unwrap_or_else(|| config.cache_dir.clone());

    if !dir.join(METADATA_DB).exists() {
        anyhow::bail!("{} is not a cache directory (no {METADATA_DB})", dir.display());
    }

    let store = CacheStore::open(&dir, true, config.cache_ttl()).await?;
    let purged = store.purge_expired().await?;
    let remaining = store.entry_count().await?;
    println!("purged {purged} expired entries from {} ({remaining} remaining)", dir.display());

    Ok(())
}

fn clear(root: &Path, yes: bool) -> Result<()> {
    let dirs = find_cache_dirs(root)?;
    if dirs.is_empty() {
        println!("no cache directories under {}", root.display());
        return Ok(());
    }

    for dir in &dirs {
        if yes {
            std::fs::remove_dir_all(dir)?;
            println!("removed {}", dir.display());
        } else {
            println!("would remove {} (pass --yes to delete)", dir.display());
        }
    }

    Ok(())
}

/// A cache directory is recognized by its index file, the same marker the
/// store writes.
fn find_cache_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() && path.join(METADATA_DB).exists() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
