//! `ledgerwise serve`: Start the HTTP gateway.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let base = format!("http://{}:{}", config.gateway.host, config.gateway.port);
    println!("📒 Ledgerwise Gateway");
    println!("   Listening on {base}");
    println!("   Provider:  {} ({})", config.default_provider, config.generation_model());
    println!();
    println!("   Endpoints:");
    println!("     POST {base}/api/chat");
    println!("     POST {base}/api/feedback");
    println!("     GET  {base}/api/sessions/{{id}}");
    println!("     POST {base}/api/index/rebuild");
    println!("     GET  {base}/health");
    println!();

    ledgerwise_gateway::start(config).await
}
