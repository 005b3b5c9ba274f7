//! Juggl command line: print the graph of a vault as cytoscape elements.

use clap::Parser;
use juggl_core::vfs::PhysicalFileSystem;
use juggl_core::{
    get_plugin, JugglError, JugglPlugin, PluginHost, PluginRegistry, PluginSettings, Result,
    VaultStore,
};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "juggl", version, about = "Graph view of a markdown vault")]
struct Args {
    /// Vault root directory
    vault: PathBuf,

    /// Plugin settings (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only the neighbourhood of this note
    #[arg(short, long)]
    local: Option<String>,

    /// Expansion depth for --local, ignored for the whole vault
    #[arg(short, long, default_value_t = 1)]
    depth: usize,

    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => PluginSettings::from_yaml(&std::fs::read_to_string(path)?)?,
        None => PluginSettings::default(),
    };
    let core_name = settings.graph_settings.core_store.clone();

    let store = Arc::new(VaultStore::load(
        args.vault.clone(),
        Arc::new(PhysicalFileSystem),
        settings.clone(),
    )?);

    let host = PluginHost::new(settings);
    host.register_core_store(store.clone(), &core_name);
    let mut registry = PluginRegistry::new();
    registry.register_juggl(Arc::new(host));

    let plugin = get_plugin(&registry).ok_or_else(|| JugglError::NotFound("juggl".into()))?;
    let mut juggl = match &args.local {
        Some(note) => {
            let start = store
                .id_of_path(note)
                .await
                .ok_or_else(|| JugglError::NotFound(note.clone()))?;
            plugin.open_local_graph(&start.id)?
        }
        None => plugin.open_global_graph()?,
    };

    let loaded = juggl.load(args.depth).await?;
    info!(
        "graph {}: {} elements added, {} merged",
        juggl.id(),
        loaded.added.len(),
        loaded.merged.len()
    );

    let elements = juggl.elements();
    let json = if args.pretty {
        serde_json::to_string_pretty(&elements)?
    } else {
        serde_json::to_string(&elements)?
    };
    println!("{json}");
    Ok(())
}
