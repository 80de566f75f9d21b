//! # Live Content API Smoke Run
//!
//! Exercises `ContentApi` against the real content and search endpoints using
//! the key from `CAPI_KEY` (or `.env`). Not part of `cargo test`: it needs
//! network access and a valid key.
//!
//! Steps:
//! 1. time-range search over the last `--hours` hours;
//! 2. faceted entity search;
//! 3. concurrent image URL lookups for the articles found, twice, to show the
//!    second round is served from the cache;
//! 4. fetch timing summary.

#![forbid(unsafe_code)]

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use futures_util::future::join_all;
use lib_common::{ContentApi, LoggerLocal, LoggerLocalOptions, SearchParams, load_content_config};
use serde_json::Value;

#[derive(Parser)]
#[clap(name = "test_content_live", about = "Smoke test the content API against live endpoints.")]
struct Cli {
    /// Entity used for the faceted search.
    #[clap(long, default_value = "people:Christine Lagarde")]
    entity: String,

    /// Width of the time-range window, in hours.
    #[clap(long, default_value_t = 24)]
    hours: i64,

    /// Maximum number of results requested per search.
    #[clap(long, default_value_t = 5)]
    max_results: u32,
}

fn result_ids(sapi_obj: &Value) -> Vec<String> {
    sapi_obj["results"][0]["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_content_config(None)?;
    let logger = Arc::new(LoggerLocal::new(
        "test_content_live".to_string(),
        Some(LoggerLocalOptions::default()),
    ));
    let api = ContentApi::with_reqwest(config, logger)?;

    println!("--- Starting live content API run ---");

    println!("\n[Test 1] Time-range search over the last {} hours...", cli.hours);
    let before = Utc::now().timestamp();
    let after = before - cli.hours * 3600;
    let range = api
        .search_time_range(after, before, SearchParams::default().with_max_results(cli.max_results))
        .await;
    let Some(sapi_obj) = range.sapi_obj.as_ref() else {
        anyhow::bail!("time-range search failed, params={}", serde_json::to_string(&range.params)?);
    };
    let ids = result_ids(sapi_obj);
    println!("✅ Time-range search returned {} ids", ids.len());

    println!("\n[Test 2] Entity search for {}...", cli.entity);
    let entity = api.search_by_entity_with_facets(&cli.entity).await;
    match entity.sapi_obj {
        Some(obj) => println!("✅ Facets: {}", obj["results"][0]["facets"]),
        None => println!("❌ Entity search failed"),
    }

    println!("\n[Test 3] Image URL lookups...");
    for round in 1..=2 {
        let lookups = join_all(ids.iter().map(|id| api.get_article_image_url(id))).await;
        let found = lookups.iter().filter(|r| matches!(r, Ok(Some(_)))).count();
        let failed = lookups.iter().filter(|r| r.is_err()).count();
        println!(
            "✅ Round {}: {} with image, {} failed, cache size {}",
            round,
            found,
            failed,
            api.cache().len()
        );
    }

    println!("\n[Test 4] Fetch timings...");
    let summary = api.summarise_fetch_timings(Some(3));
    println!("{}", serde_json::to_string_pretty(&summary)?);

    println!("\n--- Live run finished ---");
    Ok(())
}
