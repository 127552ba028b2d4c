//! Report → knowledge graph, end to end.
//!
//! Extracts paragraphs from a report, optionally summarizes them, extracts a
//! partial graph per chunk, merges them and writes the merged graph as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use api::{AppConfig, Pipeline};

#[derive(Parser)]
#[command(name = "build_graph")]
#[command(about = "Build a merged knowledge graph from a PDF or text report")]
struct Cli {
    /// Report to read (.pdf, .txt, .md) or a directory of reports
    #[arg(long)]
    input: PathBuf,

    /// Where to write the merged graph
    #[arg(long, default_value = "knowledge_graph.json")]
    output: PathBuf,

    /// Extract graphs from paragraph summaries instead of raw paragraphs
    #[arg(long)]
    summarize: bool,

    /// Generate user-style questions from the merged graph
    #[arg(long)]
    questions: bool,

    /// Max concurrent extraction calls (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = AppConfig::load()?;
    api::init_tracing();

    let cli = Cli::parse();
    if let Some(concurrency) = cli.concurrency {
        config.concurrency.max_concurrent_extractions = concurrency;
        config.concurrency.max_concurrent_llm_calls = concurrency;
    }

    let pipeline = Pipeline::from_config(config)?;

    println!("=== Knowledge Graph Builder ===\n");

    let paragraphs = pipeline.paragraphs(&cli.input).await?;
    println!("Paragraphs: {}", paragraphs.len());

    if paragraphs.is_empty() {
        println!("Nothing to extract from {:?}", cli.input);
        return Ok(());
    }

    let texts: Vec<String> = paragraphs.into_iter().map(|p| p.text).collect();

    let chunks = if cli.summarize {
        let summary = pipeline.summarize_texts(texts).await;
        println!(
            "Summaries: {} ({} failed)",
            summary.paragraph_summaries.len(),
            summary.failures.len()
        );
        summary.all_summaries()
    } else {
        texts
    };

    let build = pipeline.build_graph(chunks).await?;

    println!("\nChunks: {} ({} failed)", build.chunks, build.failures.len());
    for failure in &build.failures {
        println!("  chunk {} (len={}): {}", failure.index, failure.input_len, failure.error);
    }
    println!("Nodes: {}", build.stats.nodes);
    println!("Relationships: {}", build.stats.relationships);
    println!("Components: {}", build.stats.components);

    let json = build.graph.to_json_pretty()?;
    tokio::fs::write(&cli.output, json)
        .await
        .context(format!("Failed to write {:?}", cli.output))?;
    println!("\n✅ Graph saved to {:?}", cli.output);

    if cli.questions {
        let questions = pipeline.questions_for_graph(&build.graph).await?;
        println!("\nQuestions:");
        for question in questions {
            println!("  - {}", question);
        }
    }

    Ok(())
}
