//! `ledgerwise index`: Build the knowledge index ahead of serving.

use ledgerwise_knowledge::KnowledgeBase;
use std::path::Path;
use std::time::Instant;

pub async fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    // Only the provider vectorizer needs a live provider.
    let provider = ledgerwise_providers::router::build_from_config(&config).default();
    let knowledge = KnowledgeBase::from_config(&config.knowledge, provider)?;

    let started = Instant::now();
    let index = if force {
        knowledge.rebuild().await?
    } else {
        knowledge.ensure_index().await?
    };

    println!(
        "  ✅ Indexed {} terms with the {} vectorizer in {:.2?}",
        index.len(),
        knowledge.vectorizer().name(),
        started.elapsed()
    );
    println!("     Index file: {}", config.knowledge.index_file.display());

    Ok(())
}
