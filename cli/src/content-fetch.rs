//! # Content Fetch
//!
//! Operator front end for the content retrieval layer. Every operation of
//! `ContentApi` is a subcommand; results are printed as pretty JSON on stdout,
//! logs go to stderr through `tracing`.
//!
//! The API key (`CAPI_KEY`) is mandatory: without it the tool exits before
//! doing anything else.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use lib_common::content::query::build_query;
use lib_common::{ContentApi, LoggerLocal, LoggerLocalOptions, SearchParams, SearchResult, load_content_config};
use serde_json::{Value, json};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Fetches articles, searches and concordances from the content API.
#[derive(Parser)]
#[clap(name = "content-fetch", version, about = "Query the remote content and search APIs.")]
struct Cli {
    /// JSON configuration file; defaults to $CONFIGS_LOCATION/content.json.
    #[clap(long, short = 'c', env = "CONTENT_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// After the command, print a summary of the HTTP calls made, including the
    /// last N calls.
    #[clap(long, value_name = "N")]
    timings: Option<usize>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct QueryArgs {
    /// Free text query; takes precedence over constraints.
    #[clap(long, short = 'q')]
    query: Option<String>,

    /// `facet:value` or plain text; repeatable.
    #[clap(long = "constraint")]
    constraints: Vec<String>,

    #[clap(long)]
    ontology: Option<String>,

    #[clap(long)]
    max_results: Option<u32>,

    #[clap(long)]
    offset: Option<u32>,

    /// Result aspect; repeatable.
    #[clap(long = "aspect")]
    aspects: Vec<String>,
}

impl QueryArgs {
    fn into_params(self) -> SearchParams {
        SearchParams {
            query_string: self.query,
            max_results: self.max_results,
            offset: self.offset,
            aspects: (!self.aspects.is_empty()).then_some(self.aspects),
            constraints: (!self.constraints.is_empty()).then_some(self.constraints),
            ontology: self.ontology,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Enriched content of one article.
    Article { id: String },
    /// Main image URL of each article.
    ImageUrl {
        #[clap(required = true)]
        ids: Vec<String>,
    },
    /// Search with explicit parameters.
    Search(QueryArgs),
    /// Search for an article identifier.
    SearchId { id: String },
    /// Search content last published between two epoch-second bounds.
    TimeRange {
        after: i64,
        before: i64,
        #[clap(flatten)]
        query: QueryArgs,
    },
    /// Search for a `taxonomy:value` entity, faceting on the taxonomy.
    Entity { entity: String },
    /// Concordance record for a legacy TME identifier.
    Legacy { tme_id: String },
    /// Fetch an arbitrary API URL with the key appended.
    V2 { url: String },
    /// Print the search document for the given parameters without sending it.
    BuildQuery(QueryArgs),
}

fn setup_logging() {
    let log_level: String = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter: EnvFilter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn search_output(result: SearchResult) -> Result<Value> {
    if !result.is_success() {
        error!("search failed: params={}", serde_json::to_string(&result.params)?);
    }
    Ok(serde_json::to_value(result)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let config = match load_content_config(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load content configuration: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    info!("{}", config);

    let logger_options = LoggerLocalOptions {
        use_tty: None,
        use_file: config.log_dir.as_ref().map(|_| vec![6, 5, 4, 3, 2]),
        log_dir: config.log_dir.clone(),
        use_tracing: true,
    };
    let logger = Arc::new(LoggerLocal::new("content-fetch".to_string(), Some(logger_options)));
    let api = ContentApi::with_reqwest(config, logger)?;

    let output: Value = match cli.command {
        Command::Article { id } => api.get_article(&id).await?,
        Command::ImageUrl { ids } => {
            let mut urls = serde_json::Map::new();
            for id in ids {
                let url = api.get_article_image_url(&id).await?;
                urls.insert(id, json!(url));
            }
            Value::Object(urls)
        }
        Command::Search(args) => search_output(api.search(args.into_params()).await)?,
        Command::SearchId { id } => search_output(api.search_by_identifier(&id).await)?,
        Command::TimeRange { after, before, query } => {
            search_output(api.search_time_range(after, before, query.into_params()).await)?
        }
        Command::Entity { entity } => search_output(api.search_by_entity_with_facets(&entity).await)?,
        Command::Legacy { tme_id } => json!(api.resolve_legacy_identifier(&tme_id).await),
        Command::V2 { url } => json!(api.call_v2(&url).await),
        Command::BuildQuery(args) => serde_json::to_value(build_query(&args.into_params()))?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(history) = cli.timings {
        let summary = api.summarise_fetch_timings(Some(history));
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
