use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glam::Vec2;
use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    components::{Sex, SpeciesProfile, MAX_GROWTH_STAGE},
    spatial::{GridError, TilePos, WorldGrid},
    speed::SpeedError,
    systems::SpeedChangeAt,
    world::{Timing, World, WorldError},
};

fn default_tick_seconds() -> f64 {
    1.0 / 60.0
}

fn default_snapshot_interval_ticks() -> u64 {
    600
}

fn default_speed() -> f32 {
    1.0
}

fn default_tile_size() -> f32 {
    16.0
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("tick_seconds must be positive, got {0}")]
    TickSeconds(f64),
    #[error("seed cell {cell:?} is not walkable")]
    SeedCell { cell: TilePos },
    #[error("agent {index} is placed off the walkable map at {position}")]
    AgentPlacement { index: usize, position: Vec2 },
    #[error("species '{0}' has an empty litter range")]
    Litter(String),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Speed(#[from] SpeedError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub speed_changes: Vec<SpeedChangeAt>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub map: MapConfig,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub species: Vec<SpeciesProfile>,
    #[serde(default)]
    pub grass: GrassConfig,
    #[serde(default)]
    pub agents: Vec<ScenarioAgent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    pub rows: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrassConfig {
    #[serde(default)]
    pub seed_cells: Vec<TilePos>,
    /// Growth stage the seed patches start at.
    #[serde(default)]
    pub seed_stage: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioAgent {
    pub species: String,
    pub position: Vec2,
    pub gender: Sex,
    #[serde(default)]
    pub age: u32,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_world(&self) -> Result<World, ScenarioError> {
        if !(self.tick_seconds > 0.0) {
            return Err(ScenarioError::TickSeconds(self.tick_seconds));
        }
        let grid = WorldGrid::from_rows(&self.map.rows, self.map.tile_size)?;
        let mut world = World::new(grid, self.timing.clone(), self.tick_seconds);
        for profile in &self.species {
            if profile.breeding.litter_min > profile.breeding.litter_max {
                return Err(ScenarioError::Litter(profile.name.clone()));
            }
            world.register_species(profile.clone());
        }
        world.set_speed(self.speed)?;

        let stage = self.grass.seed_stage.min(MAX_GROWTH_STAGE);
        for &cell in &self.grass.seed_cells {
            if !world.grid().is_walkable(cell) {
                return Err(ScenarioError::SeedCell { cell });
            }
            match world.place_patch(cell) {
                Some(id) => {
                    if let Some(patch) = world.patch_mut(id) {
                        patch.set_growth_stage(stage);
                    }
                }
                None => warn!("duplicate grass seed cell {:?}", cell),
            }
        }

        for (index, agent) in self.agents.iter().enumerate() {
            let cell = world.grid().world_to_cell(agent.position);
            if !world.grid().is_walkable(cell) {
                return Err(ScenarioError::AgentPlacement {
                    index,
                    position: agent.position,
                });
            }
            world.spawn_agent(&agent.species, agent.position, agent.gender, agent.age)?;
        }
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(3_600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: pond
seed: 3
map:
  rows:
    - "....."
    - ".~~.."
    - "....."
grass:
  seed_cells:
    - { x: 0, y: 0 }
  seed_stage: 2
agents:
  - { species: Deer, position: [40.0, 40.0], gender: male, age: 2 }
"#;

    fn parse(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let scenario = parse(MINIMAL);
        assert!((scenario.tick_seconds - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(scenario.speed, 1.0);
        assert_eq!(scenario.map.tile_size, 16.0);
        assert_eq!(scenario.logging.level, "info");
        assert_eq!(scenario.timing, Timing::default());
        assert_eq!(scenario.ticks(None), 3_600);
        assert_eq!(scenario.ticks(Some(10)), 10);
    }

    #[test]
    fn test_build_world_places_everything() {
        let world = parse(MINIMAL).build_world().unwrap();
        assert_eq!(world.agent_count(), 1);
        assert_eq!(world.patch_count(), 1);
        let patch = world.patch_at(TilePos::new(0, 0)).unwrap();
        assert_eq!(world.patch(patch).unwrap().growth_stage(), 2);
        assert_eq!(world.grid().water_access().len(), 6);
    }

    #[test]
    fn test_rejects_seed_on_water() {
        let mut scenario = parse(MINIMAL);
        scenario.grass.seed_cells = vec![TilePos::new(1, 1)];
        assert!(matches!(
            scenario.build_world(),
            Err(ScenarioError::SeedCell { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_species_and_bad_speed() {
        let mut scenario = parse(MINIMAL);
        scenario.agents[0].species = "Wolf".to_string();
        assert!(matches!(
            scenario.build_world(),
            Err(ScenarioError::World(WorldError::UnknownSpecies(_)))
        ));

        let mut scenario = parse(MINIMAL);
        scenario.speed = -1.0;
        assert!(matches!(
            scenario.build_world(),
            Err(ScenarioError::Speed(_))
        ));
    }

    #[test]
    fn test_custom_timing_overrides() {
        let yaml = format!("{MINIMAL}timing:\n  day_length: 60.0\n  growth_chance: 0.5\n");
        let scenario = parse(&yaml);
        assert_eq!(scenario.timing.day_length, 60.0);
        assert_eq!(scenario.timing.growth_chance, 0.5);
        assert_eq!(scenario.timing.hunger_period, 5.0);
    }
}
