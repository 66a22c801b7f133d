//! Headless driver: run a JSON scenario against the in-memory host.
//!
//! Usage: `cotf-headless <scenario.json> [config.json]`

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use catalog_otf::host::{LayerTree, ViewProvider};
use catalog_otf::{
    CatalogConfig, CatalogRegistry, HttpFetcher, ImageRasterLoader, MemoryHost, Scenario,
    ScenarioError,
};

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(scenario_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: cotf-headless <scenario.json> [config.json]");
        return ExitCode::from(2);
    };

    let config = match args.next() {
        Some(path) => match CatalogConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => CatalogConfig::load_from_default_path().unwrap_or_default(),
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    match run(&scenario_path, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path, config: &CatalogConfig) -> Result<(), ScenarioError> {
    let scenario = Scenario::load(path)?;
    let host = scenario.build_host()?;

    let loader = Rc::new(ImageRasterLoader::new(config.descriptor_extensions.clone()));
    let fetcher = Rc::new(HttpFetcher::new(config.fetch_timeout()));
    let registry = CatalogRegistry::new(host.context(loader, fetcher), config.controller_settings());

    let found = registry.find_catalogs();
    println!("Found {} catalog(s)", found);

    for toggle in &scenario.toggles {
        if !registry.apply_toggle(&toggle.layer, toggle.kind, toggle.on) {
            log::warn!(
                "{} toggle of '{}' was rejected",
                toggle.kind.name(),
                toggle.layer
            );
        }
    }
    print_state(&host, &registry);

    for extent in scenario.pan_extents()? {
        println!();
        println!(
            "Pan to ({}, {}) - ({}, {})",
            extent.min().x,
            extent.min().y,
            extent.max().x,
            extent.max().y
        );
        host.set_extent(extent);
        print_state(&host, &registry);
    }

    for message in host.messages() {
        println!("[{:?}] {}", message.level, message.text);
    }
    Ok(())
}

fn print_state(host: &MemoryHost, registry: &CatalogRegistry) {
    println!("{}", registry.table().borrow().render());

    for layer_id in registry.layer_ids() {
        let Some(controller) = registry.controller(&layer_id) else {
            continue;
        };
        let Some(group) = controller.borrow().group() else {
            continue;
        };
        let name = host.node_name(group).unwrap_or_default();
        println!("{}:", name);
        for layer in host.layers_in(group) {
            println!("  {}", layer.name);
        }
    }
}
