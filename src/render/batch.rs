//! Render a whole topology on the blocking thread pool.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::Renderer;
use crate::models::{ConfigSnippet, Topology};

/// Load the template sets of every kind used by `topology`, concurrently
pub async fn load_templates(
    renderer: &Renderer,
    base_path: impl Into<PathBuf>,
    topology: &Topology,
) -> Result<()> {
    let base_path = base_path.into();
    let mut handles = Vec::new();
    for kind in topology.kinds() {
        let renderer = renderer.clone();
        let base_path = base_path.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            renderer.load_templates(&kind, &base_path)
        }));
    }
    for handle in handles {
        handle.await.context("template load task failed")??;
    }
    tracing::info!("Loaded templates for kinds: {:?}", renderer.store().kinds());
    Ok(())
}

/// Render all nodes, then all links, with at most `concurrency` renders in flight.
///
/// Snippets come back in topology order: one per node, then A and B of each link.
pub async fn render_topology(
    renderer: &Renderer,
    topology: &Topology,
    concurrency: usize,
) -> Result<Vec<ConfigSnippet>> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles: Vec<JoinHandle<Result<Vec<ConfigSnippet>>>> = Vec::new();

    for node in &topology.nodes {
        let permits = permits.clone();
        let renderer = renderer.clone();
        let node = node.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let snippet = tokio::task::spawn_blocking(move || renderer.render_node(&node)).await??;
            Ok(vec![snippet])
        }));
    }

    for link in &topology.links {
        let permits = permits.clone();
        let renderer = renderer.clone();
        let link = link.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let (a, b) = tokio::task::spawn_blocking(move || renderer.render_link(&link)).await??;
            Ok(vec![a, b])
        }));
    }

    let mut snippets = Vec::new();
    for handle in handles {
        snippets.extend(handle.await.context("render task failed")??);
    }
    tracing::info!(
        "Rendered {} nodes and {} links ({} snippets)",
        topology.nodes.len(),
        topology.links.len(),
        snippets.len()
    );
    Ok(snippets)
}
