//! Saving and restoring faction economies and the ship registry.
//!
//! Only mutable state is written. Faction configuration, hull stats and the sector
//! graph come from reference data on every load and are joined back by id.

use bevy::prelude::*;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bridge::abstract_view;
use crate::catalog::ReferenceData;
use crate::factions::{FactionId, FactionRegistry};
use crate::fleets::seed_starting_fleets;
use crate::host::EntityHost;
use crate::registry::ShipRegistry;
use crate::ships::{
    AiState, Cargo, DefensePools, Navigation, Ship, ShipClasses, ShipId, ShipRole, ShipStats, Task,
};
use crate::world::{SectorGraph, SectorId};

pub const SAVE_VERSION: u32 = 1;
pub const SAVE_KEY: &str = "factions";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum PersistenceError {
    Store(std::io::Error),
    Parse(ron::error::SpannedError),
    Serialize(ron::Error),
    UnsupportedVersion { found: u32, supported: u32 },
    Incomplete(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::Parse(err) => write!(f, "parse error: {err}"),
            Self::Serialize(err) => write!(f, "serialize error: {err}"),
            Self::UnsupportedVersion { found, supported } => write!(
                f,
                "save version {found} is newer than supported version {supported}"
            ),
            Self::Incomplete(reason) => write!(f, "incomplete save: {reason}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<std::io::Error> for PersistenceError {
    fn from(value: std::io::Error) -> Self {
        Self::Store(value)
    }
}

impl From<ron::error::SpannedError> for PersistenceError {
    fn from(value: ron::error::SpannedError) -> Self {
        Self::Parse(value)
    }
}

impl From<ron::Error> for PersistenceError {
    fn from(value: ron::Error) -> Self {
        Self::Serialize(value)
    }
}

// =============================================================================
// Stores
// =============================================================================

/// Key-value blob storage.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError>;
}

/// One `<key>.ron` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.ron", key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), blob)?;
        Ok(())
    }
}

// =============================================================================
// Save format
// =============================================================================

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SaveData {
    /// Absent in blobs written before versioning.
    #[serde(default)]
    pub version: u32,
    pub factions: Vec<SavedFaction>,
    #[serde(default)]
    pub ships: Vec<SavedShip>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SavedFaction {
    pub id: FactionId,
    #[serde(default)]
    pub treasury: Option<f64>,
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub expenses: f64,
    #[serde(default)]
    pub income_rate: f64,
    #[serde(default)]
    pub expense_rate: f64,
    /// Seconds the open income/expense window had been running at save time.
    #[serde(default)]
    pub window_age: f64,
    #[serde(default)]
    pub ships_lost: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SavedShip {
    #[serde(default)]
    pub id: Option<ShipId>,
    pub faction: FactionId,
    pub role: ShipRole,
    pub class: String,
    pub name: String,
    pub sector: SectorId,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub defense: Option<DefensePools>,
    #[serde(default)]
    pub cargo: Option<Cargo>,
    #[serde(default)]
    pub task: Option<Task>,
    #[serde(default)]
    pub state: AiState,
    #[serde(default)]
    pub nav: Navigation,
    #[serde(default)]
    pub stats: ShipStats,
    #[serde(default)]
    pub cycle_progress: f32,
    #[serde(default)]
    pub task_elapsed: f32,
}

impl SavedShip {
    fn from_ship(ship: Ship) -> Self {
        Self {
            id: Some(ship.id),
            faction: ship.faction,
            role: ship.role,
            class: ship.class,
            name: ship.name,
            sector: ship.sector,
            x: ship.position.x,
            y: ship.position.y,
            defense: Some(ship.defense),
            cargo: Some(ship.cargo),
            task: ship.task,
            state: ship.state,
            nav: ship.nav,
            stats: ship.stats,
            cycle_progress: ship.cycle_progress,
            task_elapsed: ship.task_elapsed,
        }
    }

    /// Rebuilds the record, filling absent pools and hold from the hull class.
    fn into_ship(self, classes: &ShipClasses) -> Option<Ship> {
        let id = self.id?;
        let class = classes.get(&self.class);
        let defense = match (self.defense, class) {
            (Some(defense), _) => defense,
            (None, Some(class)) => DefensePools::full(class.shield, class.armor, class.hull),
            (None, None) => return None,
        };
        let cargo = match (self.cargo, class) {
            (Some(cargo), _) => cargo,
            (None, Some(class)) => Cargo::with_capacity(class.cargo_capacity),
            (None, None) => return None,
        };
        let mut ship = Ship {
            id,
            faction: self.faction,
            role: self.role,
            class: self.class,
            name: self.name,
            sector: self.sector,
            position: Vec2::new(self.x, self.y),
            defense,
            cargo,
            task: self.task,
            state: self.state,
            nav: self.nav,
            stats: self.stats,
            cycle_progress: self.cycle_progress,
            task_elapsed: self.task_elapsed,
        };
        ship.defense.clamp();
        Some(ship)
    }
}

/// Captures faction economies and every ship, live ones in abstract form.
pub fn snapshot(
    factions: &FactionRegistry,
    registry: &ShipRegistry,
    host: &impl EntityHost,
    now: f64,
) -> SaveData {
    let factions = factions
        .iter()
        .map(|faction| SavedFaction {
            id: faction.id().clone(),
            treasury: Some(faction.ledger.treasury),
            income: faction.ledger.income,
            expenses: faction.ledger.expenses,
            income_rate: faction.ledger.income_rate,
            expense_rate: faction.ledger.expense_rate,
            window_age: (now - faction.ledger.window_started_at).max(0.0),
            ships_lost: faction.ships_lost,
        })
        .collect();
    let ships = abstract_view(registry, host)
        .into_iter()
        .map(SavedShip::from_ship)
        .collect();
    SaveData {
        version: SAVE_VERSION,
        factions,
        ships,
    }
}

pub fn encode(data: &SaveData) -> Result<String, PersistenceError> {
    let config = ron::ser::PrettyConfig::default();
    Ok(ron::ser::to_string_pretty(data, config)?)
}

/// Parses a blob and migrates it to the current version.
pub fn decode(blob: &str) -> Result<SaveData, PersistenceError> {
    let mut data = ron::de::from_str::<SaveData>(blob)?;
    if data.version > SAVE_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: data.version,
            supported: SAVE_VERSION,
        });
    }
    if data.version == 0 {
        debug!("Migrating unversioned save to version {}", SAVE_VERSION);
        data.version = SAVE_VERSION;
    }
    Ok(data)
}

/// Writes the current state under [`SAVE_KEY`]. Returns the number of ships saved.
pub fn save_state(
    store: &mut impl StateStore,
    factions: &FactionRegistry,
    registry: &ShipRegistry,
    host: &impl EntityHost,
    now: f64,
) -> Result<usize, PersistenceError> {
    let data = snapshot(factions, registry, host, now);
    let blob = encode(&data)?;
    store.set(SAVE_KEY, &blob)?;
    Ok(data.ships.len())
}

// =============================================================================
// Loading
// =============================================================================

#[derive(Debug)]
pub struct LoadedState {
    pub factions: FactionRegistry,
    pub ships: ShipRegistry,
    pub from_save: bool,
    pub skipped: usize,
}

/// Rebuilds factions and ships from the saved blob.
pub fn load_state(
    store: &impl StateStore,
    reference: &impl ReferenceData,
    classes: &ShipClasses,
    graph: &SectorGraph,
    now: f64,
) -> Result<LoadedState, PersistenceError> {
    let Some(blob) = store.get(SAVE_KEY)? else {
        return Err(PersistenceError::Incomplete(format!(
            "nothing saved under '{}'",
            SAVE_KEY
        )));
    };
    let data = decode(&blob)?;
    restore(data, reference, classes, graph, now)
}

pub fn restore(
    data: SaveData,
    reference: &impl ReferenceData,
    classes: &ShipClasses,
    graph: &SectorGraph,
    now: f64,
) -> Result<LoadedState, PersistenceError> {
    if data.factions.is_empty() {
        return Err(PersistenceError::Incomplete("no factions".to_string()));
    }

    let mut factions =
        FactionRegistry::from_configs(reference.faction_configs().iter().cloned(), now);
    for saved in data.factions {
        let Some(faction) = factions.get_mut(&saved.id) else {
            warn!("Dropping saved economy for unknown faction {}", saved.id);
            continue;
        };
        if let Some(treasury) = saved.treasury {
            faction.ledger.treasury = treasury;
        }
        faction.ledger.income = saved.income;
        faction.ledger.expenses = saved.expenses;
        faction.ledger.income_rate = saved.income_rate;
        faction.ledger.expense_rate = saved.expense_rate;
        faction.ledger.window_started_at = now - saved.window_age.max(0.0);
        faction.ships_lost = saved.ships_lost;
    }

    let mut ships = ShipRegistry::default();
    let mut skipped = 0;
    for saved in data.ships {
        let known = factions.get(&saved.faction).is_some() && graph.contains(saved.sector);
        let ship = if known { saved.into_ship(classes) } else { None };
        let inserted = match ship {
            Some(ship) => ships.insert(ship),
            None => false,
        };
        if !inserted {
            skipped += 1;
        }
    }
    if skipped > 0 {
        warn!("Skipped {} unusable ship records", skipped);
    }

    factions.set_ship_counts(&ships.count_by_faction());
    resume_names(&mut ships);

    Ok(LoadedState {
        factions,
        ships,
        from_save: true,
        skipped,
    })
}

/// Loads the save, or builds a fresh world when there is nothing usable to load.
pub fn load_or_seed(
    store: &impl StateStore,
    reference: &impl ReferenceData,
    classes: &ShipClasses,
    graph: &SectorGraph,
    rng: &mut impl Rng,
    now: f64,
) -> LoadedState {
    match load_state(store, reference, classes, graph, now) {
        Ok(loaded) => {
            info!(
                "Loaded {} factions and {} ships",
                loaded.factions.len(),
                loaded.ships.len()
            );
            loaded
        }
        Err(error) => {
            warn!("No usable save ({}), starting fresh", error);
            fresh_state(reference, classes, graph, rng, now)
        }
    }
}

pub fn fresh_state(
    reference: &impl ReferenceData,
    classes: &ShipClasses,
    graph: &SectorGraph,
    rng: &mut impl Rng,
    now: f64,
) -> LoadedState {
    let mut factions =
        FactionRegistry::from_configs(reference.faction_configs().iter().cloned(), now);
    let mut ships = ShipRegistry::default();
    seed_starting_fleets(&mut ships, &mut factions, classes, graph, rng);
    LoadedState {
        factions,
        ships,
        from_save: false,
        skipped: 0,
    }
}

/// Continues hull numbering past the highest number already in use.
fn resume_names(ships: &mut ShipRegistry) {
    let mut issued: BTreeMap<(FactionId, ShipRole), u32> = BTreeMap::new();
    for entry in ships.iter() {
        let number = entry
            .ship
            .name
            .rsplit('-')
            .next()
            .and_then(|suffix| suffix.parse::<u32>().ok())
            .unwrap_or(0);
        let key = (entry.ship.faction.clone(), entry.ship.role);
        let highest = issued.entry(key).or_insert(0);
        *highest = (*highest).max(number);
    }
    for ((faction, role), number) in issued {
        ships.names.resume(&faction, role, number);
    }
}

// =============================================================================
// Tests
// =============================================================================
