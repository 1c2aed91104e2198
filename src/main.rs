//! concept-rag - Main CLI Entry Point

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use concept_rag::{
    cli::{Args, Commands, Verbosity},
    config::Config,
    rag::{CorpusQuery, RagPipeline},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    telemetry::init(verbosity);

    if let Commands::Init { force } = &args.command {
        return run_init(args.config.clone(), *force);
    }

    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    let mode = args.deployment_mode()?;
    let pipeline = config
        .build_pipeline(mode)
        .await
        .context("Failed to initialize pipeline")?;

    if verbosity.show_details() {
        eprintln!("{} {}", "Mode:".dimmed(), pipeline.mode());
    }

    match &args.command {
        Commands::Validate { detailed } => {
            let valid = run_validate(&pipeline, *detailed).await?;
            if !valid {
                std::process::exit(1);
            }
        }
        Commands::Search { query, .. } => {
            let options = args.command.search_options();
            run_search(&pipeline, query, options, verbosity).await?;
        }
        Commands::Context { query, max_length, .. } => {
            let options = args.command.search_options();
            let answer = pipeline
                .context_for_query(query, options.as_ref(), *max_length)
                .await?;
            println!("{}", answer.context.text);
            if verbosity.show_details() {
                eprintln!(
                    "{} {} chars, {} documents{}",
                    "Context:".dimmed(),
                    answer.context.length,
                    answer.context.document_ids.len(),
                    if answer.context.truncated { ", truncated" } else { "" }
                );
            }
        }
        Commands::Stats => run_stats(&pipeline).await?,
        Commands::Themes => {
            let documents = pipeline.load_documents().await?;
            for name in CorpusQuery::new(&documents).theme_names() {
                println!("{}", name);
            }
        }
        Commands::Stocks { name } => {
            let documents = pipeline.load_documents().await?;
            let query = CorpusQuery::new(&documents);
            match name {
                Some(stock) => {
                    let relations = query.themes_by_stock(stock);
                    if relations.is_empty() {
                        println!("{}", format!("No themes found for {}", stock).yellow());
                    }
                    for doc in relations {
                        println!("{} {}", doc.theme_name.bold(), doc.theme_id.dimmed());
                    }
                }
                None => {
                    for stock in query.stock_names() {
                        println!("{}", stock);
                    }
                }
            }
        }
        Commands::Init { .. } => {}
        Commands::IndexStats { no_index } => {
            if !*no_index {
                index_with_spinner(&pipeline, verbosity).await?;
            }
            let stats = pipeline.vector_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn run_init(path: Option<std::path::PathBuf>, force: bool) -> Result<()> {
    let Some(path) = path.or_else(Config::default_path) else {
        bail!("No home directory; pass --config");
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let mut config = Config::load_default()?;
    config.apply_env();
    config.validate()?;
    config.save(&path)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

async fn run_validate(pipeline: &RagPipeline, detailed: bool) -> Result<bool> {
    let (manifest, documents) = pipeline.load_corpus().await?;

    if detailed {
        let report = pipeline.detailed_report(&manifest, &documents);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.integrity.is_valid && report.manifest.is_valid);
    }

    let report = pipeline.validate(&manifest, &documents);
    if report.is_valid {
        println!(
            "{} {} documents match the manifest",
            "✓".green(),
            documents.len()
        );
    } else {
        println!("{} {} integrity errors", "✗".red(), report.errors.len());
        for error in &report.errors {
            println!("  - {}", error);
        }
    }
    Ok(report.is_valid)
}

async fn run_search(
    pipeline: &RagPipeline,
    query: &str,
    options: Option<concept_rag::SearchOptions>,
    verbosity: Verbosity,
) -> Result<()> {
    let results = pipeline.search(query, options.as_ref()).await?;
    if results.is_empty() {
        println!("{}", "No matching documents".yellow());
        return Ok(());
    }

    for (i, hit) in results.iter().enumerate() {
        println!("{}. {} {}", i + 1, hit.metadata.title.bold(), format!("[{:.2}]", hit.score).cyan());
        if verbosity.show_details() {
            println!("   {}", hit.doc_id.dimmed());
        }
    }
    Ok(())
}

async fn run_stats(pipeline: &RagPipeline) -> Result<()> {
    let (manifest, documents) = pipeline.load_corpus().await?;
    let stats = CorpusQuery::new(&documents).stats();

    println!("{}", "Corpus".bold());
    println!("  documents:       {} (manifest {})", stats.total, manifest.total);
    println!("  theme_overview:  {}", stats.theme_overview);
    println!("  theme_to_stock:  {}", stats.theme_to_stock);
    println!("  unique themes:   {}", stats.unique_themes);
    println!("  unique stocks:   {}", stats.unique_stocks);

    let cache = pipeline.cache_stats();
    println!("{}", "Cache".bold());
    for (name, slot) in [("manifest", &cache.manifest), ("documents", &cache.documents)] {
        let age = slot
            .age_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<10} cached={} age={} stale={}", name, slot.cached, age, slot.stale);
    }
    Ok(())
}

async fn index_with_spinner(pipeline: &RagPipeline, verbosity: Verbosity) -> Result<usize> {
    let pb = if verbosity.show_progress() {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Embedding documents...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = pipeline.index_documents().await;
    if let Some(pb) = pb {
        match &result {
            Ok(count) => pb.finish_with_message(format!("Indexed {} documents", count)),
            Err(_) => pb.finish_and_clear(),
        }
    }
    Ok(result?)
}
