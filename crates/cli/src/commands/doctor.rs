//! `ledgerwise doctor`: Diagnose configuration and knowledge files.

use ledgerwise_knowledge::{FileIndexStorage, IndexStorage, KnowledgeStore};
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Ledgerwise Doctor — System Diagnostics");
    println!("=========================================\n");

    let mut issues = 0;

    let path = super::config_path(config_path);
    if !path.exists() {
        println!("  ⚠️  No config file at {} — using defaults (run `ledgerwise init`)", path.display());
        issues += 1;
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured ({})", config.default_provider);
        let router = ledgerwise_providers::router::build_from_config(&config);
        let mut registered = router.list();
        registered.sort_unstable();
        println!("  ℹ️  Providers registered: {}", registered.join(", "));
        println!("  ℹ️  Generation model: {}", config.generation_model());
        match router.default() {
            Some(provider) => match provider.health_check().await {
                Ok(true) => println!("  ✅ Provider {} reachable", provider.name()),
                Ok(false) => {
                    println!("  ⚠️  Provider {} rejected the health check", provider.name());
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Provider unreachable: {e}");
                    issues += 1;
                }
            },
            None => {
                println!("  ❌ No provider registered for '{}'", config.default_provider);
                issues += 1;
            }
        }
    } else {
        println!("  ⚠️  No API key configured — set LEDGERWISE_API_KEY");
        issues += 1;
    }

    let knowledge_file = &config.knowledge.knowledge_file;
    if knowledge_file.exists() {
        match KnowledgeStore::load(knowledge_file) {
            Ok(store) => println!("  ✅ Knowledge file has {} terms", store.len()),
            Err(e) => {
                println!("  ❌ Knowledge file unreadable: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ⚠️  No knowledge file — defaults will be seeded on first start");
        issues += 1;
    }

    let storage = FileIndexStorage::new(config.knowledge.index_file.clone());
    match storage.load().await {
        Ok(Some(index)) => match index.validate(config.knowledge.dimension) {
            Ok(()) => println!("  ✅ Index cached with {} terms", index.len()),
            Err(e) => {
                println!("  ⚠️  Cached index will be rebuilt: {e}");
                issues += 1;
            }
        },
        Ok(None) => println!("  ℹ️  No cached index — it will be built on first request"),
        Err(e) => {
            println!("  ⚠️  Cached index will be rebuilt: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
