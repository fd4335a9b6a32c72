use anyhow::{Context, Result};
use charlist::api::CollectionClient;
use charlist::app::{build_http_client, App};
use charlist::config::Config;
use charlist::images::HttpImageFetcher;
use charlist::util::validate_base_url;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(name = "charlist", about = "Browse and search Disney characters from the terminal")]
struct Args {
    /// Config file (default: ~/.config/charlist/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API base URL, overrides the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Characters per page, overrides the config file
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,

    /// Start with a search instead of the first page
    #[arg(long, value_name = "NAME")]
    search: Option<String>,

    /// Print one page (or the --search result) and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with the list on stdout
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            tracing::debug!("HOME not set, using default configuration");
            Config::default()
        }
    };
    let config = config.with_overrides(args.base_url, args.page_size);

    validate_base_url(&config.api_base_url)
        .with_context(|| format!("Invalid API base URL '{}'", config.api_base_url))?;

    let http = build_http_client(config.request_timeout()).context("Failed to build HTTP client")?;
    let source = CollectionClient::new(http.clone(), config.api_base_url.clone())
        .with_timeout(config.request_timeout());
    let fetcher = HttpImageFetcher::new(http, config.image_cache_entries)
        .with_timeout(config.request_timeout());

    tracing::info!(
        base_url = %source.base_url(),
        page_size = config.page_size,
        "Starting"
    );

    let mut app = App::new(Arc::new(source), Arc::new(fetcher), &config);
    match args.search.as_deref() {
        Some(name) => app.feed.search(name),
        None => app.feed.load_first_page(),
    };

    let mut stdout = std::io::stdout().lock();
    if args.once {
        return charlist::ui::run_once(&mut app, &mut stdout).await;
    }

    let stdin = BufReader::new(tokio::io::stdin());
    charlist::ui::run(&mut app, stdin, &mut stdout).await
}
