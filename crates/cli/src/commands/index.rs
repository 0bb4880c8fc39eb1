//! Index command handler.
//!
//! Builds the corpus snapshot and dense index, and describes what was built.

use agri_core::{config::AppConfig, AppResult};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Offline index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Merge corpus shards and embed every document
    Build(IndexBuildCommand),
    /// Show snapshot and index statistics
    Stats(IndexStatsCommand),
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config),
        }
    }
}

/// Build the snapshot and dense index
#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Directory holding the *.jsonl corpus shards
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index build command");

        let mut config = config.clone();
        if let Some(ref data_dir) = self.data_dir {
            config.corpus.data_dir = data_dir.clone();
        }

        let stats = agri_knowledge::build_index(&config).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Indexed {} documents ({} dims, {}/{}) in {:.2}s",
                stats.documents, stats.dimensions, stats.provider, stats.model, stats.duration_secs
            );
            println!("Snapshot fingerprint: {}", stats.fingerprint);
        }

        Ok(())
    }
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index stats command");

        let stats = agri_knowledge::index_stats(config)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        let manifest = &stats.manifest;
        println!("Documents:    {}", manifest.count);
        println!("Embeddings:   {}/{} ({} dims)", manifest.provider, manifest.model, manifest.dimensions);
        println!("Built at:     {}", manifest.built_at.to_rfc3339());
        println!("Fingerprint:  {}", manifest.fingerprint);
        println!("Index size:   {:.2} MB", stats.db_size_bytes as f64 / (1024.0 * 1024.0));

        println!("\nDocuments by metric:");
        for (metric, count) in &stats.metrics {
            println!("  {:<14} {}", metric, count);
        }

        if !stats.districts_by_state.is_empty() {
            println!("\nDistricts by state:");
            for (state, count) in &stats.districts_by_state {
                println!("  {:<24} {}", state, count);
            }
        }

        Ok(())
    }
}
