use gis_catalog_rust::config::AppConfig;
use gis_catalog_rust::seed;
use gis_catalog_rust::store::Catalog;
use log::info;

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new().filter_level(LevelFilter::Info).init();

    println!("GIS Catalog: in-memory configuration catalog");

    let config = AppConfig::load()?;
    info!(
        "configuration loaded: delete_emptied_groups={}",
        config.cascade.delete_emptied_groups
    );

    let catalog = Catalog::new(config.cascade);

    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        info!("loading seed data...");
        seed::load_seed_data(&catalog)?;
    }

    let snapshot = catalog.snapshot();
    info!(
        "catalog ready: {} workspaces, {} stores, {} resources, {} layers, {} styles, {} layer groups",
        snapshot.workspaces.len(),
        snapshot.stores.len(),
        snapshot.resources.len(),
        snapshot.layers.len(),
        snapshot.styles.len(),
        snapshot.layer_groups.len()
    );

    Ok(())
}
