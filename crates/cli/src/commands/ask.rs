//! `ledgerwise ask`: Answer one question from the terminal.

use ledgerwise_agent::{ChatPipeline, ChatRequest};
use std::path::Path;

pub async fn run(config_path: Option<&Path>, message: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    if !config.has_api_key() {
        return Err("No API key configured. Set LEDGERWISE_API_KEY or run `ledgerwise init`.".into());
    }

    let provider = ledgerwise_providers::router::build_from_config(&config)
        .default()
        .ok_or("No default provider configured")?;
    let pipeline = ChatPipeline::from_config(&config, provider)?;

    let outcome = pipeline
        .chat(ChatRequest::new(message))
        .await
        .map_err(|f| format!("Chat failed: {}", f.error))?;

    println!("{}", outcome.response);
    if !outcome.relevant_terms.is_empty() {
        println!();
        println!("  Related terms: {}", outcome.relevant_terms.join(", "));
    }

    Ok(())
}
