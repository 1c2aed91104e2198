//! Command-line argument parsing for concept-rag
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::errors::Result;
use crate::source::DeploymentMode;
use crate::types::{DocumentType, SearchFilter, SearchOptions};

/// concept-rag - Theme and stock document retrieval for LLM prompts
#[derive(Parser, Debug)]
#[command(name = "concept-rag")]
#[command(version)]
#[command(about = "Load, validate and search the theme/stock RAG corpus", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Deployment mode: embedded, local or remote (overrides config)
    #[arg(long, global = true)]
    pub mode: Option<String>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress everything except results)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the manifest against the documents
    Validate {
        /// Print per-document results
        #[arg(long)]
        detailed: bool,
    },

    /// Ranked search over the corpus
    Search {
        query: String,

        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,

        /// Only `theme_overview` or `theme_to_stock`
        #[arg(long = "type", value_parser = parse_doc_type)]
        doc_type: Option<DocumentType>,

        #[arg(long)]
        theme: Option<String>,

        #[arg(long)]
        ticker: Option<String>,
    },

    /// Build the prompt context for a query
    Context {
        query: String,

        /// Character budget (config default when omitted)
        #[arg(long)]
        max_length: Option<usize>,

        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,
    },

    /// Corpus statistics and cache state
    Stats,

    /// List theme names
    Themes,

    /// List stock names, or the themes of one stock
    Stocks {
        /// Show the themes linked to this stock
        #[arg(long)]
        name: Option<String>,
    },

    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Index the corpus and show vector store statistics
    IndexStats {
        /// Skip indexing, only report
        #[arg(long)]
        no_index: bool,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Parsed `--mode`, if given
    pub fn deployment_mode(&self) -> Result<Option<DeploymentMode>> {
        self.mode.as_deref().map(str::parse).transpose()
    }
}

fn parse_doc_type(value: &str) -> std::result::Result<DocumentType, String> {
    DocumentType::parse(value).ok_or_else(|| {
        format!(
            "unknown document type '{}' (expected {} or {})",
            value,
            DocumentType::ThemeOverview,
            DocumentType::ThemeToStock
        )
    })
}

impl Commands {
    /// Search options from the `search` flags
    pub fn search_options(&self) -> Option<SearchOptions> {
        match self {
            Commands::Search {
                top_k,
                doc_type,
                theme,
                ticker,
                ..
            } => Some(SearchOptions {
                top_k: *top_k,
                filter: SearchFilter {
                    doc_type: *doc_type,
                    theme_id: theme.clone(),
                    ticker: ticker.clone(),
                },
            }),
            Commands::Context { top_k, .. } => Some(SearchOptions::top_k(*top_k)),
            _ => None,
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show scores and ids
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
