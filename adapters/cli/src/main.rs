#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! Command-line tools for inspecting generated worlds, the star map, and
//! database files.

mod config;
mod preview;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context as _};
use clap::{Parser, Subcommand};
use orbitile_context::WorldTemplate;
use orbitile_core::{CelestialCoordinate, IVec2, RectI};
use orbitile_storage::BTreeDatabase;
use orbitile_system_celestial::{
    CelestialDatabase, CelestialGenerationConfig, CelestialMasterDatabase,
};
use orbitile_system_terrain::{Selector, TerrainDatabase, TerrainSelectorParameters};
use orbitile_world::{EMPTY_MATERIAL_ID, SECTOR_KEY_SIZE, SECTOR_STORE_IDENTIFIER};

use crate::config::OrbitileConfig;
use crate::preview::{format_record, render_region};

const DETACHED_WORLD_NAME: &str = "custom";
const DETACHED_WORLD_GRAVITY: f32 = 80.0;

#[derive(Parser)]
#[command(name = "orbitile", about = "Inspect orbitile worlds, star maps and databases")]
struct Cli {
    /// TOML file with [world], [celestial] and [storage] sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

/// Cells to sample, given by their lower corner and size.
#[derive(clap::Args, Clone, Copy)]
struct RegionArgs {
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    x: i32,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    y: i32,
    #[arg(long, default_value_t = 80)]
    width: i32,
    #[arg(long, default_value_t = 40)]
    height: i32,
}

impl RegionArgs {
    fn rect(self) -> RectI {
        RectI::with_size(IVec2::new(self.x, self.y), IVec2::new(self.width, self.height))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print a terrain selector's solidity as ASCII
    Terrain {
        /// Named selector, or a JSON file holding a stored selector
        #[arg(long)]
        selector: String,
        #[command(flatten)]
        region: RegionArgs,
    },
    /// List star systems inside a region of the star map
    Systems {
        /// Only list systems of this type (repeatable)
        #[arg(long = "type")]
        types: Vec<String>,
        #[command(flatten)]
        region: RegionArgs,
    },
    /// List the records of a database file
    Storage {
        #[arg(long)]
        path: PathBuf,
        /// Content identifier; defaults to [storage].content_identifier
        #[arg(long)]
        identifier: Option<String>,
        /// Key width in bytes; defaults to [storage].key_size
        #[arg(long)]
        key_size: Option<usize>,
    },
    /// Generate part of a world through its sector storage and print it
    World {
        /// Celestial body to build the world for; [world] is used when absent
        #[arg(long)]
        coordinate: Option<String>,
        #[arg(long, default_value = "rollingHills")]
        selector: String,
        /// Named selector carving caves out of the ground
        #[arg(long)]
        cave: Option<String>,
        #[command(flatten)]
        region: RegionArgs,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = OrbitileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Terrain { selector, region } => terrain(&config, &selector, region.rect()),
        Command::Systems { types, region } => systems(&config, types, region.rect()),
        Command::Storage {
            path,
            identifier,
            key_size,
        } => storage(&config, &path, identifier, key_size),
        Command::World {
            coordinate,
            selector,
            cave,
            region,
        } => world(&config, coordinate.as_deref(), &selector, cave.as_deref(), region.rect()),
    }
}

fn terrain(config: &OrbitileConfig, name: &str, region: RectI) -> anyhow::Result<()> {
    let database = TerrainDatabase::builtin().context("loading built-in selectors")?;
    let parameters = detached_template(config).selector_parameters();
    let selector = resolve_selector(&database, name, parameters)?;
    log::info!("sampling {} selector over {}x{}", selector.kind(), region.width(), region.height());
    print!("{}", render_region(region, |cell| selector.get(cell.x, cell.y) >= 0.0));
    Ok(())
}

/// Builds `name` from the table, or loads it when it names a file.
fn resolve_selector(
    database: &TerrainDatabase,
    name: &str,
    parameters: TerrainSelectorParameters,
) -> anyhow::Result<Selector> {
    let path = Path::new(name);
    if path.is_file() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading selector {}", path.display()))?;
        let stored: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing selector {}", path.display()))?;
        return database
            .load(&stored)
            .with_context(|| format!("building selector from {}", path.display()));
    }
    database
        .create_named_selector(name, parameters)
        .with_context(|| format!("building selector {name}"))
}

fn celestial_master(config: &OrbitileConfig) -> anyhow::Result<CelestialMasterDatabase> {
    let generation =
        CelestialGenerationConfig::builtin().context("loading built-in celestial config")?;
    CelestialMasterDatabase::new(config.celestial.clone(), generation)
        .context("opening celestial database")
}

fn systems(config: &OrbitileConfig, types: Vec<String>, region: RectI) -> anyhow::Result<()> {
    let master = celestial_master(config)?;
    let include: Option<BTreeSet<String>> = if types.is_empty() {
        None
    } else {
        Some(types.into_iter().collect())
    };
    let found = master.scan_systems(region, include.as_ref());
    for coordinate in &found {
        let Some(parameters) = master.parameters(coordinate) else {
            continue;
        };
        let planets = master.child_orbits(coordinate).map_or(0, |orbits| orbits.len());
        println!(
            "{coordinate}\t{}\t{}\t{planets} planets",
            parameters.name,
            parameters.type_name().unwrap_or("-"),
        );
    }
    log::info!("{} systems in region", found.len());
    master.commit().context("committing celestial chunks")?;
    Ok(())
}

fn storage(
    config: &OrbitileConfig,
    path: &Path,
    identifier: Option<String>,
    key_size: Option<usize>,
) -> anyhow::Result<()> {
    ensure!(path.is_file(), "no database at {}", path.display());
    let identifier = identifier.unwrap_or_else(|| config.storage.content_identifier.clone());
    let key_size = key_size.unwrap_or(config.storage.key_size);
    let database = BTreeDatabase::open(path, &identifier, key_size)
        .with_context(|| format!("opening {}", path.display()))?;
    database
        .for_each(|key, value| println!("{}", format_record(key, value)))
        .with_context(|| format!("reading records of {}", path.display()))?;
    log::info!("{} records in {}", database.record_count(), path.display());
    Ok(())
}

fn detached_template(config: &OrbitileConfig) -> WorldTemplate {
    WorldTemplate::detached(
        DETACHED_WORLD_NAME,
        config.world.size,
        config.world.seed,
        DETACHED_WORLD_GRAVITY,
    )
}

fn world(
    config: &OrbitileConfig,
    coordinate: Option<&str>,
    selector: &str,
    cave: Option<&str>,
    region: RectI,
) -> anyhow::Result<()> {
    let template = match coordinate {
        Some(text) => {
            let coordinate: CelestialCoordinate = text
                .parse()
                .with_context(|| format!("parsing coordinate {text}"))?;
            let master = celestial_master(config)?;
            let Some(parameters) = master.parameters(&coordinate) else {
                bail!("nothing at {coordinate}");
            };
            WorldTemplate::from_celestial(&parameters)
                .with_context(|| format!("{} at {coordinate} cannot be visited", parameters.name))?
        }
        None => detached_template(config),
    };

    let terrain = TerrainDatabase::builtin().context("loading built-in selectors")?;
    let generator = template
        .sector_generator(&terrain, selector, cave)
        .context("building sector generator")?;
    let database = match &config.world.storage_path {
        Some(path) => BTreeDatabase::open(path, SECTOR_STORE_IDENTIFIER, SECTOR_KEY_SIZE)
            .with_context(|| format!("opening {}", path.display()))?,
        None => BTreeDatabase::in_memory(SECTOR_STORE_IDENTIFIER, SECTOR_KEY_SIZE)?,
    };
    let mut storage =
        template.create_storage(database, Box::new(generator), config.world.storage_config());
    let loaded = storage
        .load_region(region)
        .with_context(|| format!("loading region of {}", template.name()))?;
    log::info!(
        "{} ({}x{}): {} sectors loaded",
        template.name(),
        template.size().x,
        template.size().y,
        loaded.len()
    );
    print!(
        "{}",
        render_region(region, |cell| storage.tile(cell).foreground != EMPTY_MATERIAL_ID)
    );
    if config.world.storage_path.is_some() {
        ensure!(storage.commit(), "could not commit world sectors");
    }
    Ok(())
}
