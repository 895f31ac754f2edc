use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topo_render::config::{Config, OutputFormat};
use topo_render::render::batch;
use topo_render::{Renderer, TemplateStore, Topology};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing; stdout carries the rendered config
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "topo_render=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = Config::load();
    tracing::info!("Templates: {}", cfg.templates_dir);
    tracing::info!("Topology: {}", cfg.topology_file);

    let topology = Topology::from_file(&cfg.topology_file)?;
    tracing::info!(
        "Topology {}: {} nodes, {} links",
        topology.name,
        topology.nodes.len(),
        topology.links.len()
    );

    let renderer = Renderer::with_system_ip(Arc::new(TemplateStore::new()));
    batch::load_templates(&renderer, &cfg.templates_dir, &topology).await?;
    let snippets = batch::render_topology(&renderer, &topology, cfg.render_concurrency).await?;

    match cfg.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snippets)?),
        OutputFormat::Text => {
            for snippet in &snippets {
                println!("# {}", snippet);
                print!("{}", snippet.text());
            }
        }
    }

    Ok(())
}
