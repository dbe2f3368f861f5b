//! ContextForge CLI
//!
//! Ranks fixture documents against a query, or rebuilds the quoted comment
//! trees of fixture forum posts, and prints the result to stdout.

mod cli;
mod fixtures;
mod service;

use anyhow::Context;
use clap::Parser;
use contextforge_common::{
    config::AppConfig,
    metrics,
    output::{render_raw, render_slim_json, render_slim_xml, OutputFormat, SlimRecord},
    similarity::{create_similarity, Similarity},
    VERSION,
};
use contextforge_ranking::RankingEngine;
use contextforge_threads::ThreadBuilder;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::fixtures::FixtureProvider;
use crate::service::ContextService;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if tracing::enabled!(tracing::Level::ERROR) {
            error!(error = %format!("{e:#}"), "contextforge failed");
        } else {
            eprintln!("Error: {e:#}");
        }
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    init_tracing(&config);
    info!("Starting ContextForge v{}", VERSION);

    config.validate()?;
    metrics::register_metrics();

    let similarity = create_similarity(&config.similarity).context("failed to create similarity provider")?;
    info!(similarity = similarity.name(), "Similarity primitive initialized");

    match cli.command {
        Commands::Rank {
            query,
            input,
            top_n,
            search_limit,
            format,
        } => {
            let fixture = Arc::new(FixtureProvider::load(&input).await?);
            let engine = RankingEngine::from_config(&config, similarity)?;
            let service = ContextService::new(
                fixture.clone(),
                fixture.clone(),
                fixture,
                engine,
                ThreadBuilder::from_config(&config.threads),
            )
            .with_forum_domain(config.threads.forum_domain.clone());

            let top_n = top_n.unwrap_or(config.ranking.top_n);
            let outcome = service.rank_documents(&query, search_limit, top_n).await?;
            if outcome.skipped > 0 {
                info!(skipped = outcome.skipped, "Some records were skipped");
            }

            let rendered = match OutputFormat::from(format) {
                OutputFormat::Raw => render_raw(&outcome.ranked)?,
                OutputFormat::SlimJson => render_slim_json(&slim(&outcome.ranked))?,
                OutputFormat::SlimXml => render_slim_xml(&slim(&outcome.ranked), "videos", "video"),
            };
            println!("{}", rendered);
        }

        Commands::Thread {
            input,
            posts,
            search,
            limit,
            top_k,
            format,
        } => {
            let fixture = Arc::new(FixtureProvider::load(&input).await?);
            let posts = if posts.is_empty() { fixture.post_ids() } else { posts };
            let builder = match top_k {
                Some(k) => ThreadBuilder::new(k),
                None => ThreadBuilder::from_config(&config.threads),
            };
            let service = ContextService::new(
                fixture.clone(),
                fixture.clone(),
                fixture,
                RankingEngine::from_config(&config, similarity)?,
                builder,
            )
            .with_forum_domain(config.threads.forum_domain.clone());

            let outcomes = match search {
                Some(query) => service.search_threads(&query, limit).await?,
                None => service.fetch_threads(&posts).await?,
            };
            let threaded: Vec<_> = outcomes.into_iter().map(|o| o.post).collect();

            let rendered = match OutputFormat::from(format) {
                OutputFormat::Raw => render_raw(&threaded)?,
                OutputFormat::SlimJson => render_slim_json(&slim(&threaded))?,
                OutputFormat::SlimXml => render_slim_xml(&slim(&threaded), "threads", "thread"),
            };
            println!("{}", rendered);
        }
    }

    Ok(())
}

fn slim<'a, T>(items: &'a [T]) -> Vec<SlimRecord>
where
    SlimRecord: From<&'a T>,
{
    items.iter().map(SlimRecord::from).collect()
}

/// Logs go to stderr so stdout carries only the rendered output
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
