//! Search Gateway CLI - serve the REST API or run one search from the shell.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use search_gateway::api::create_router;
use search_gateway::engines::EngineKind;
use search_gateway::{SearchGateway, SearchMode, SearchOptions, SearchTarget, Settings};

/// Search Gateway - REST API over scraped search engine results
#[derive(Parser)]
#[command(name = "search-gateway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Run a single search and print the results
    Search(SearchArgs),

    /// List available search engines
    Engines,
}

#[derive(Parser)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
}

#[derive(Parser)]
struct SearchArgs {
    /// Search mode
    #[arg(short, long, default_value = "simple")]
    mode: Mode,

    /// Query (simple mode)
    query: Option<String>,

    /// Company name (company mode)
    #[arg(long)]
    company_name: Option<String>,

    /// Company domain (domain and full modes)
    #[arg(short, long)]
    domain: Option<String>,

    /// Person's full name (full mode)
    #[arg(long)]
    full_name: Option<String>,

    /// Search engines to use (comma-separated)
    /// Available: google (g), bing (b), yahoo (y), duckduckgo (ddg)
    #[arg(short, long, value_delimiter = ',')]
    engines: Option<Vec<String>>,

    /// Pages per engine (capped by MAX_SEARCH_PAGES)
    #[arg(long)]
    pages: Option<u32>,

    /// Keep results whose URL another engine already returned
    #[arg(long)]
    keep_duplicates: bool,

    /// Maximum number of results to display
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Proxy URL (e.g., http://127.0.0.1:8080 or socks5://127.0.0.1:1080)
    #[arg(short = 'x', long)]
    proxy: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Simple,
    Company,
    Domain,
    Full,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Simple => SearchMode::Simple,
            Mode::Company => SearchMode::Company,
            Mode::Domain => SearchMode::Domain,
            Mode::Full => SearchMode::Full,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output (full response envelope)
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads its env fallbacks.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Serve(_), false) => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(true)
        .init();

    let settings = Settings::from_env().context("Failed to load settings")?;

    match cli.command {
        Commands::Serve(args) => serve(args, settings).await,
        Commands::Search(args) => run_search(args, settings).await,
        Commands::Engines => list_engines(&settings),
    }
}

async fn serve(args: ServeArgs, mut settings: Settings) -> Result<()> {
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }

    let gateway = Arc::new(SearchGateway::from_settings(&settings)?);
    let app = create_router(gateway, &settings);

    let listener = tokio::net::TcpListener::bind(settings.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_address()))?;
    info!(
        "{} listening on {} (API prefix '{}')",
        settings.project_name,
        listener.local_addr()?,
        settings.api_prefix
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down");
}

/// Default engines may be configured by name or shortcut.
fn is_default(settings: &Settings, kind: EngineKind) -> bool {
    settings
        .default_engines
        .iter()
        .any(|e| EngineKind::from_str(e).ok() == Some(kind))
}

fn list_engines(settings: &Settings) -> Result<()> {
    println!("Available search engines:\n");
    for kind in EngineKind::ALL {
        let marker = if is_default(settings, kind) {
            " (default)"
        } else {
            ""
        };
        println!(
            "    {:<11} {:<4} - {}{}",
            kind.name(),
            kind.shortcut(),
            kind.description(),
            marker
        );
    }
    println!();
    println!("Usage: search-gateway search --mode domain --domain example.com -e g,ddg");
    Ok(())
}

async fn run_search(args: SearchArgs, mut settings: Settings) -> Result<()> {
    if let Some(proxy_url) = &args.proxy {
        settings.proxy_urls = vec![proxy_url.clone()];
        if matches!(args.format, OutputFormat::Text) {
            eprintln!("Using proxy: {}", proxy_url);
        }
    }

    let target = build_target(&args)?;
    let mut options = SearchOptions::new()
        .with_ignore_duplicates(!args.keep_duplicates)
        .with_proxy(args.proxy.is_some() || settings.use_proxy);
    if let Some(engines) = args.engines.clone() {
        for engine in &engines {
            EngineKind::from_str(engine)?;
        }
        options = options.with_engines(engines);
    }
    if let Some(pages) = args.pages {
        options = options.with_pages(pages);
    }

    let gateway = SearchGateway::from_settings(&settings)?;
    let response = gateway.search(&target, &options).await?;

    match args.format {
        OutputFormat::Text => {
            println!(
                "\nSearch results for {} ({} results in {}ms):\n",
                response.query, response.total_results, response.metadata.duration_ms
            );

            for (i, result) in response.items().iter().take(args.limit).enumerate() {
                println!("{}. {}", i + 1, result.title);
                println!("   URL: {}", result.url);
                if !result.snippet.is_empty() {
                    println!("   {}", truncate(&result.snippet, 150));
                }
                println!();
            }

            for entry in response.results_by_engine.iter().filter(|e| e.is_failure()) {
                eprintln!(
                    "Warning: {} failed: {}",
                    entry.engine,
                    entry.error.as_deref().unwrap_or_default()
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Compact => {
            for result in response.items().iter().take(args.limit) {
                println!("{}\t{}", result.title, result.url);
            }
        }
    }

    Ok(())
}

fn build_target(args: &SearchArgs) -> Result<SearchTarget> {
    fn required(value: &Option<String>, flag: &str, mode: &str) -> Result<String> {
        value
            .clone()
            .with_context(|| format!("{} mode requires {}", mode, flag))
    }

    let mode = SearchMode::from(args.mode);
    Ok(match mode {
        SearchMode::Simple => SearchTarget::Simple {
            query: required(&args.query, "a QUERY argument", "simple")?,
        },
        SearchMode::Company => SearchTarget::Company {
            company_name: required(&args.company_name, "--company-name", "company")?,
        },
        SearchMode::Domain => SearchTarget::Domain {
            domain: required(&args.domain, "--domain", "domain")?,
        },
        SearchMode::Full => SearchTarget::Full {
            full_name: required(&args.full_name, "--full-name", "full")?,
            domain: required(&args.domain, "--domain", "full")?,
        },
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_search_command() {
        let cli = Cli::try_parse_from([
            "search-gateway",
            "search",
            "--mode",
            "full",
            "--full-name",
            "Jane Doe",
            "-d",
            "acme.io",
            "-e",
            "g,ddg",
        ])
        .unwrap();
        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.engines.clone().unwrap(), vec!["g", "ddg"]);
        let target = build_target(&args).unwrap();
        assert_eq!(
            target,
            SearchTarget::Full {
                full_name: "Jane Doe".to_string(),
                domain: "acme.io".to_string()
            }
        );
    }

    #[test]
    fn test_build_target_requires_mode_inputs() {
        let cli = Cli::try_parse_from(["search-gateway", "search", "--mode", "domain"]).unwrap();
        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };
        assert!(build_target(&args).is_err());
    }

    #[test]
    fn test_default_marking_accepts_shortcuts() {
        let settings = Settings {
            default_engines: vec!["ddg".to_string(), "Google".to_string()],
            ..Default::default()
        };
        assert!(is_default(&settings, EngineKind::DuckDuckGo));
        assert!(is_default(&settings, EngineKind::Google));
        assert!(!is_default(&settings, EngineKind::Bing));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("short", 10), "short");
    }
}
