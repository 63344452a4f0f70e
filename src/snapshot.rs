use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use glam::Vec2;
use serde::Serialize;

use crate::{
    clock::SimDate,
    components::Sex,
    spatial::TilePos,
    world::{AgentId, PatchId, World},
};

/// Read-only view of one agent for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub id: AgentId,
    pub name: String,
    pub species: String,
    pub gender: Sex,
    pub age: u32,
    pub health: f32,
    pub hunger: f32,
    pub thirst: f32,
    pub energy: f32,
    pub position: Vec2,
    pub facing: f32,
    pub activity: &'static str,
    pub label: Option<String>,
    pub visual_stage: u8,
    pub pregnant: bool,
    pub pregnancy_progress: f64,
    pub mate: Option<AgentId>,
    pub meat: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchView {
    pub id: PatchId,
    pub cell: TilePos,
    pub position: Vec2,
    pub growth_stage: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub elapsed_seconds: f64,
    pub speed: f32,
    pub date: SimDate,
    pub generated_at: DateTime<Utc>,
    pub agents: Vec<AgentView>,
    pub patches: Vec<PatchView>,
}

impl WorldSnapshot {
    pub fn capture(world: &World, scenario: &str) -> Self {
        let agents = world
            .agents()
            .map(|agent| AgentView {
                id: agent.id,
                name: agent.name.clone(),
                species: agent.species.clone(),
                gender: agent.gender,
                age: agent.vitals.age,
                health: agent.vitals.health,
                hunger: agent.vitals.hunger,
                thirst: agent.vitals.thirst,
                energy: agent.vitals.energy,
                position: agent.position,
                facing: agent.facing,
                activity: agent.activity.name(),
                label: agent.label.map(|label| label.to_string()),
                visual_stage: agent.visual_stage(),
                pregnant: agent.is_pregnant(),
                pregnancy_progress: agent.pregnancy_progress(),
                mate: agent.mate,
                meat: agent.meat,
            })
            .collect();
        let patches = world
            .patches()
            .map(|patch| PatchView {
                id: patch.id,
                cell: patch.cell,
                position: world.grid().cell_to_world(patch.cell),
                growth_stage: patch.growth_stage(),
            })
            .collect();

        Self {
            scenario: scenario.to_string(),
            tick: world.tick(),
            elapsed_seconds: world.elapsed_seconds(),
            speed: world.speed_factor(),
            date: world.date(),
            generated_at: Utc::now(),
            agents,
            patches,
        }
    }
}

/// Writes `<dir>/<scenario>/tick_NNNNNN.json` every `interval` ticks.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn is_due(&self, tick: u64) -> bool {
        self.interval > 0 && tick % self.interval == 0
    }

    pub fn maybe_write(&self, snapshot: &WorldSnapshot) -> Result<Option<PathBuf>> {
        if !self.is_due(snapshot.tick) {
            return Ok(None);
        }
        let dir = self.dir.join(&snapshot.scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("tick_{:06}.json", snapshot.tick));
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::spatial::WorldGrid;
    use crate::world::Timing;

    fn small_world() -> World {
        let mut world = World::new(WorldGrid::new(6, 6, 16.0), Timing::default(), 0.5);
        world
            .spawn_agent("Deer", Vec2::new(20.0, 20.0), Sex::Female, 4)
            .unwrap();
        world.place_patch(TilePos::new(2, 3)).unwrap();
        world
    }

    #[test]
    fn test_capture_reflects_world() {
        let world = small_world();
        let snapshot = WorldSnapshot::capture(&world, "meadow");
        assert_eq!(snapshot.scenario, "meadow");
        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.agents[0].visual_stage, 1);
        assert_eq!(snapshot.agents[0].activity, "idle");
        assert_eq!(snapshot.patches[0].position, Vec2::new(40.0, 56.0));
    }

    #[test]
    fn test_writer_respects_interval() {
        let dir = tempdir().unwrap();
        let mut world = small_world();
        let writer = SnapshotWriter::new(dir.path(), 2);

        world.advance_time();
        let first = WorldSnapshot::capture(&world, "meadow");
        assert!(writer.maybe_write(&first).unwrap().is_none());

        world.advance_time();
        let second = WorldSnapshot::capture(&world, "meadow");
        let path = writer.maybe_write(&second).unwrap().unwrap();
        assert!(path.ends_with("meadow/tick_000002.json"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["tick"], 2);
        assert_eq!(json["agents"][0]["gender"], "female");
        assert_eq!(json["date"]["season"], "Summer");
    }

    #[test]
    fn test_zero_interval_disables_output() {
        let writer = SnapshotWriter::new("unused", 0);
        assert!(!writer.is_due(0));
        assert!(!writer.is_due(10));
    }
}
