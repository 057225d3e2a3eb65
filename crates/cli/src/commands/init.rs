//! `ledgerwise init`: Write a default config and seed the knowledge file.

use ledgerwise_config::AppConfig;
use ledgerwise_knowledge::KnowledgeStore;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("📒 Ledgerwise Setup");
    println!("===================\n");

    let path = super::config_path(config_path);
    if path.exists() {
        println!("  ✅ Config already exists at {}", path.display());
    } else {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, AppConfig::default_toml())?;
        println!("  ✅ Wrote default config to {}", path.display());
    }

    let config = super::load_config(config_path)?;
    let knowledge_file = &config.knowledge.knowledge_file;
    let existed = knowledge_file.exists();
    let store = KnowledgeStore::load_or_seed(knowledge_file)?;
    if existed {
        println!(
            "  ✅ Knowledge file has {} terms ({})",
            store.len(),
            knowledge_file.display()
        );
    } else {
        println!(
            "  ✅ Seeded {} default terms into {}",
            store.len(),
            knowledge_file.display()
        );
    }

    println!();
    if config.has_api_key() {
        println!("  Next: `ledgerwise index` then `ledgerwise serve`");
    } else {
        println!("  Next: set LEDGERWISE_API_KEY (or api_key in config.toml), then `ledgerwise serve`");
    }

    Ok(())
}
