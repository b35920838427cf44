use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pluck::{render_items, ParserConfig, RssParser, DEFAULT_ITEM_TEMPLATE};

#[derive(Parser, Debug)]
#[command(name = "pluck", about = "Fetch an RSS feed and print its items")]
struct Args {
    /// Feed URL (http:// or https://)
    url: String,

    /// Path to a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Inline item template; #{tag} and #{tag.attr} placeholders
    #[arg(long)]
    template: Option<String>,

    /// Read the item template from a file
    #[arg(long, value_name = "FILE", conflicts_with = "template")]
    template_file: Option<PathBuf>,

    /// Directory for cached feed contents (must exist)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Cache lifetime in seconds (0 disables caching)
    #[arg(long, value_name = "SECONDS")]
    cache_lifetime: Option<u64>,

    /// Bypass the cache for this run
    #[arg(long)]
    no_cache: bool,

    /// Maximum number of items to print (0 = all)
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Number of leading items to skip
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Print the parsed feed as JSON instead of rendering the template
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pluck=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ParserConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => ParserConfig::default(),
    };

    // CLI flags override the config file
    if let Some(dir) = args.cache_dir {
        config.cache_dir = Some(dir);
    }
    if let Some(secs) = args.cache_lifetime {
        config.cache_lifetime_secs = secs;
    }
    if args.no_cache {
        config.cache_dir = None;
        config.cache_lifetime_secs = 0;
    }
    if let Some(template) = args.template {
        config.item_template = Some(template);
    } else if let Some(path) = &args.template_file {
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read template file '{}'", path.display()))?;
        config.item_template = Some(template);
    }

    let template = config
        .item_template
        .clone()
        .unwrap_or_else(|| DEFAULT_ITEM_TEMPLATE.to_string());

    let parser = RssParser::new(config)?;
    let document = parser
        .parse(&args.url)
        .with_context(|| format!("failed to parse feed '{}'", args.url))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!(
            "{}",
            render_items(&document.items, &template, args.limit, args.offset)
        );
    }

    Ok(())
}
