//! Ranksight CLI - retrieval evaluation and pairwise LLM judging.
//!
//! # Usage
//!
//! ```bash
//! # Load projects and queries
//! ranksight import data.json
//!
//! # Score retrieval (skips queries that already have results)
//! ranksight evaluate
//! ranksight evaluate --all --mode hybrid
//!
//! # Inspect results
//! ranksight metrics
//! ranksight failures -n 20
//!
//! # Judge the top results with an LLM (cost control: 10 queries)
//! ranksight judge --max-queries 10
//! ranksight rankings
//! ranksight compare -n 5
//! ```
//!
//! Settings are read from the environment (and a `.env` file); see `config.rs`.

mod commands;
mod config;
mod dataset;
mod elastic;
mod llm;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Settings;
use elastic::ElasticChannel;
use llm::OpenAiChatModel;
use ranksight_core::config::{judge_calls_for, FAILURE_RANK_CUTOFF};
use ranksight_core::judge::{LlmJudge, TournamentConfig};
use ranksight_core::pipeline::{
    recompute_preferences, JudgingRunConfig, JudgingRunner, RetrievalRunConfig, RetrievalRunner,
};
use ranksight_core::search::{HybridRetriever, SearchChannel, SearchMode};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ranksight retrieval evaluation CLI.
///
/// Scores a project search index against labelled queries and uses an LLM
/// judge to compare its top results pairwise.
#[derive(Parser)]
#[command(name = "ranksight", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Custom data directory (default: platform standard location)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Load projects and queries from a JSON file
    Import {
        /// Path to the import file
        file: PathBuf,
    },

    /// Run every pending query through search and score the results
    Evaluate {
        /// Re-run queries that already have results
        #[arg(long)]
        all: bool,

        /// Search mode (text, vector, hybrid); overrides SEARCH_MODE
        #[arg(long)]
        mode: Option<SearchMode>,

        /// Results per query; overrides TOP_K_RETRIEVAL
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show MRR and hit rates for stored results
    Metrics,

    /// List queries whose ground truth missed the top ranks
    Failures {
        /// Maximum number of cases to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Rank cutoff for a failure
        #[arg(long, default_value_t = FAILURE_RANK_CUTOFF)]
        cutoff: usize,
    },

    /// Judge the top results of evaluated queries pairwise with an LLM
    Judge {
        /// Maximum number of queries to judge in this run
        #[arg(long)]
        max_queries: Option<usize>,

        /// Projects per query; overrides TOP_K_JUDGE
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Pairs judged concurrently
        #[arg(long, default_value = "1")]
        concurrency: usize,
    },

    /// Recompute preference scores from all judgments
    Rankings,

    /// Show queries where the LLM and the index disagree most
    Compare {
        /// Number of queries to show
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    let db_path = config::database_path(cli.data_dir.as_ref(), &settings)?;
    let store = commands::open_store(&db_path)?;

    let rendered = match cli.command {
        Command::Import { file } => {
            let parsed = dataset::read_import_file(&file)?;
            let summary = dataset::import_into(&store, &parsed).await?;
            if cli.json {
                output::format_json(&summary)
            } else {
                output::format_import(&summary)
            }
        }

        Command::Evaluate { all, mode, top_k } => {
            let mode = mode.unwrap_or(settings.search_mode);
            let retriever = build_retriever(&settings, mode)?;
            let config = RetrievalRunConfig {
                top_k: top_k.unwrap_or(settings.top_k_retrieval),
                skip_existing: !all,
                ..Default::default()
            };

            let pb = output::progress_bar("Evaluating", cli.json);
            let report = RetrievalRunner::new(&store, &retriever)
                .run(&config, |p| output::update_progress(&pb, &p))
                .await
                .context("Retrieval run failed")?;
            pb.finish_and_clear();

            if cli.json {
                output::format_json(&output::EvaluateOutput::from(&report))
            } else {
                output::format_evaluate(&report)
            }
        }

        Command::Metrics => {
            let report = commands::build_metrics(&store).await?;
            if cli.json {
                output::format_json(&report)
            } else {
                output::format_metrics(&report)
            }
        }

        Command::Failures { limit, cutoff } => {
            let cases = commands::find_failures(&store, cutoff, limit).await?;
            if cli.json {
                output::format_json(&cases)
            } else {
                output::format_failures(&cases, cutoff)
            }
        }

        Command::Judge {
            max_queries,
            top_k,
            concurrency,
        } => {
            let model = OpenAiChatModel::from_settings(settings.http.client()?, &settings.llm)?;
            let judge = LlmJudge::new(model);
            let config = JudgingRunConfig {
                top_k: top_k.unwrap_or(settings.top_k_judge),
                max_queries,
                tournament: TournamentConfig { concurrency },
            };
            info!(
                "Judging with {} (up to {} calls per query)",
                settings.llm.model,
                judge_calls_for(config.top_k)
            );

            let pb = output::progress_bar("Judging", cli.json);
            let report = JudgingRunner::new(&store, &judge)
                .run(&config, |p| output::update_progress(&pb, &p))
                .await
                .context("Judging run failed")?;
            pb.finish_and_clear();

            if cli.json {
                output::format_json(&report)
            } else {
                output::format_judging(&report)
            }
        }

        Command::Rankings => {
            let report = recompute_preferences(&store)
                .await
                .context("Failed to compute preference rankings")?;
            if cli.json {
                output::format_json(&report)
            } else {
                output::format_rankings(&report)
            }
        }

        Command::Compare { limit } => {
            let groups = commands::build_comparison(&store, limit).await?;
            if cli.json {
                output::format_json(&groups)
            } else {
                output::format_comparison(&groups)
            }
        }
    };

    println!("{}", rendered);
    Ok(())
}

/// Builds the retriever for `mode` from the Elasticsearch settings.
fn build_retriever(settings: &Settings, mode: SearchMode) -> Result<HybridRetriever> {
    let client = settings.http.client()?;
    let text: Option<Box<dyn SearchChannel>> = Some(Box::new(ElasticChannel::text(
        client.clone(),
        &settings.elastic,
    )));
    let vector: Option<Box<dyn SearchChannel>> = ElasticChannel::knn(client, &settings.elastic)
        .map(|c| Box::new(c) as Box<dyn SearchChannel>);

    HybridRetriever::new(mode, text, vector).with_context(|| {
        format!(
            "Search mode '{}' needs ELASTIC_VECTOR_FIELD and ELASTIC_EMBEDDING_MODEL_ID",
            mode
        )
    })
}
