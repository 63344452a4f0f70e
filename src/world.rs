use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, Season, SimDate};
use crate::components::{Activity, Agent, NeedTimers, ResourcePatch, Sex, SpeciesProfile};
use crate::scheduler::{Pace, TimerEvent, TimerId, TimerQueue};
use crate::spatial::{TilePos, WorldGrid};
use crate::speed::{SpeedController, SpeedError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(u64);

impl AgentId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatchId(u64);

impl PatchId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

fn default_hunger_period() -> f64 {
    5.0
}

fn default_thirst_period() -> f64 {
    2.0
}

fn default_energy_period() -> f64 {
    1.0
}

fn default_day_length() -> f64 {
    240.0
}

fn default_growth_period() -> f64 {
    5.0
}

fn default_chance() -> f64 {
    0.02
}

fn default_vegetation_period() -> f64 {
    10.0
}

fn default_remains_delay() -> f64 {
    300.0
}

fn default_mating_display() -> f64 {
    2.0
}

/// Base periods (simulated seconds at 1x) and probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default = "default_hunger_period")]
    pub hunger_period: f64,
    #[serde(default = "default_thirst_period")]
    pub thirst_period: f64,
    #[serde(default = "default_energy_period")]
    pub energy_period: f64,
    #[serde(default = "default_day_length")]
    pub day_length: f64,
    #[serde(default = "default_growth_period")]
    pub growth_period: f64,
    #[serde(default = "default_chance")]
    pub growth_chance: f64,
    #[serde(default = "default_vegetation_period")]
    pub spread_period: f64,
    #[serde(default = "default_vegetation_period")]
    pub spawn_period: f64,
    #[serde(default = "default_chance")]
    pub spawn_chance: f64,
    #[serde(default = "default_remains_delay")]
    pub remains_delay: f64,
    /// Wall-clock seconds; not scaled by the speed factor.
    #[serde(default = "default_mating_display")]
    pub mating_display: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            hunger_period: default_hunger_period(),
            thirst_period: default_thirst_period(),
            energy_period: default_energy_period(),
            day_length: default_day_length(),
            growth_period: default_growth_period(),
            growth_chance: default_chance(),
            spread_period: default_vegetation_period(),
            spawn_period: default_vegetation_period(),
            spawn_chance: default_chance(),
            remains_delay: default_remains_delay(),
            mating_display: default_mating_display(),
        }
    }
}

/// Notifications published by the world for observers outside the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    SpeedChanged { old: f32, new: f32 },
    DayAdvanced { date: SimDate },
    AgentSpawned { id: AgentId },
    AgentBorn { id: AgentId, mother: AgentId, father: AgentId },
    MatePaired { male: AgentId, female: AgentId },
    Mated { male: AgentId, female: AgentId },
    AgentDied { id: AgentId },
    AgentRemoved { id: AgentId },
    PatchPlaced { id: PatchId, cell: TilePos },
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),
    #[error(transparent)]
    Speed(#[from] SpeedError),
}

/// Owns every agent and patch plus the shared clock, speed factor, timer
/// queue and terrain. Agents and patches iterate in creation order.
pub struct World {
    tick: u64,
    dt_seconds: f64,
    grid: WorldGrid,
    clock: Clock,
    speed: SpeedController,
    timing: Timing,
    pub(crate) timers: TimerQueue,
    pub(crate) agents: BTreeMap<AgentId, Agent>,
    pub(crate) patches: BTreeMap<PatchId, ResourcePatch>,
    patch_cells: HashMap<TilePos, PatchId>,
    species: HashMap<String, SpeciesProfile>,
    events: Vec<SimEvent>,
    day_timer: Option<TimerId>,
    next_agent: u64,
    next_patch: u64,
}

impl World {
    pub fn new(grid: WorldGrid, timing: Timing, dt_seconds: f64) -> Self {
        let mut world = Self {
            tick: 0,
            dt_seconds,
            grid,
            clock: Clock::new(),
            speed: SpeedController::new(),
            timing,
            timers: TimerQueue::new(),
            agents: BTreeMap::new(),
            patches: BTreeMap::new(),
            patch_cells: HashMap::new(),
            species: HashMap::new(),
            events: Vec::new(),
            day_timer: None,
            next_agent: 0,
            next_patch: 0,
        };
        world.register_species(SpeciesProfile::deer());
        world.day_timer = Some(world.schedule_repeating(TimerEvent::DayEnd, world.timing.day_length));
        world.schedule_repeating(TimerEvent::SpreadGrass, world.timing.spread_period);
        world.schedule_repeating(TimerEvent::SpawnGrass, world.timing.spawn_period);
        world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn dt_seconds(&self) -> f64 {
        self.dt_seconds
    }

    /// Tick time elapsed since the start, in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.timers.now()
    }

    pub fn advance_time(&mut self) {
        self.tick += 1;
        self.timers.advance(self.dt_seconds);
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub(crate) fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn date(&self) -> SimDate {
        self.clock.date()
    }

    pub fn season(&self) -> Season {
        self.clock.season()
    }

    pub fn speed_factor(&self) -> f32 {
        self.speed.factor()
    }

    /// Remaining seconds of the current day at the current speed.
    pub fn day_remaining(&self) -> Option<f64> {
        self.timers.remaining(self.day_timer?)
    }

    /// Changes the global factor and rescales every scaled timer by the
    /// ratio of old to new, keeping their progress.
    pub fn set_speed(&mut self, factor: f32) -> Result<bool, SpeedError> {
        let Some(change) = self.speed.set(factor)? else {
            return Ok(false);
        };
        self.timers.rescale(change.old, change.new);
        info!("game speed changed {}x -> {}x", change.old, change.new);
        self.publish(SimEvent::SpeedChanged {
            old: change.old,
            new: change.new,
        });
        Ok(true)
    }

    pub fn register_species(&mut self, profile: SpeciesProfile) {
        self.species.insert(profile.name.clone(), profile);
    }

    pub fn species(&self, name: &str) -> Option<&SpeciesProfile> {
        self.species.get(name)
    }

    pub fn spawn_agent(
        &mut self,
        species: &str,
        position: Vec2,
        gender: Sex,
        age: u32,
    ) -> Result<AgentId, WorldError> {
        let profile = self
            .species
            .get(species)
            .ok_or_else(|| WorldError::UnknownSpecies(species.to_string()))?;
        let id = AgentId(self.next_agent);
        self.next_agent += 1;
        let agent = Agent::new(id, profile, position, gender, age);
        self.insert_agent(agent);
        self.publish(SimEvent::AgentSpawned { id });
        Ok(id)
    }

    fn insert_agent(&mut self, mut agent: Agent) {
        let id = agent.id;
        agent.timers = Some(NeedTimers {
            hunger: self.schedule_repeating(TimerEvent::Hunger(id), self.timing.hunger_period),
            thirst: self.schedule_repeating(TimerEvent::Thirst(id), self.timing.thirst_period),
            energy: self.schedule_repeating(TimerEvent::Energy(id), self.timing.energy_period),
        });
        debug!("spawned {} {} at {:?}", agent.gender, agent.name, agent.position);
        self.agents.insert(id, agent);
    }

    /// Spawns a newborn next to its mother and links both parents.
    pub(crate) fn spawn_offspring(
        &mut self,
        mother: AgentId,
        father: AgentId,
        gender: Sex,
    ) -> Option<AgentId> {
        let (species, position) = {
            let mother = self.agents.get(&mother)?;
            (mother.species.clone(), mother.position)
        };
        let profile = self.species.get(&species)?;
        let id = AgentId(self.next_agent);
        self.next_agent += 1;
        let mut child = Agent::new(id, profile, position, gender, 0);
        child.lineage.mother = Some(mother);
        child.lineage.father = Some(father);
        self.insert_agent(child);

        for parent in [mother, father] {
            if let Some(parent) = self.agents.get_mut(&parent) {
                parent.lineage.children.push(id);
            }
        }
        self.publish(SimEvent::AgentBorn { id, mother, father });
        Some(id)
    }

    /// Deletes an agent permanently.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        self.release_mate(id);
        let agent = self.agents.remove(&id)?;
        if let Some(timers) = agent.timers {
            self.cancel_need_timers(timers);
        }
        self.publish(SimEvent::AgentRemoved { id });
        Some(agent)
    }

    pub(crate) fn stop_needs(&mut self, id: AgentId) {
        let timers = self.agents.get_mut(&id).and_then(|agent| agent.timers.take());
        if let Some(timers) = timers {
            self.cancel_need_timers(timers);
        }
    }

    fn cancel_need_timers(&mut self, timers: NeedTimers) {
        self.timers.cancel(timers.hunger);
        self.timers.cancel(timers.thirst);
        self.timers.cancel(timers.energy);
    }

    /// Clears a pairing on both sides.
    pub(crate) fn release_mate(&mut self, id: AgentId) {
        let Some(partner) = self.agents.get(&id).and_then(|agent| agent.mate) else {
            return;
        };
        for member in [id, partner] {
            if let Some(agent) = self.agents.get_mut(&member) {
                if agent.mate.is_some() {
                    agent.mate = None;
                    agent.collides = true;
                    if agent.activity == Activity::Mating {
                        agent.activity = Activity::Idle;
                        agent.target = None;
                    }
                }
            }
        }
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn live_agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|agent| agent.is_alive())
    }

    pub fn live_agents_of_species<'a>(
        &'a self,
        species: &'a str,
    ) -> impl Iterator<Item = &'a Agent> + 'a {
        self.live_agents().filter(move |agent| agent.species == species)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Places a stage-0 patch on a walkable, unoccupied cell.
    pub fn place_patch(&mut self, cell: TilePos) -> Option<PatchId> {
        if self.patch_cells.contains_key(&cell) {
            debug!("cell {:?} already has grass", cell);
            return None;
        }
        if !self.grid.is_walkable(cell) {
            warn!("refusing to place grass on non-walkable cell {:?}", cell);
            return None;
        }
        let id = PatchId(self.next_patch);
        self.next_patch += 1;
        let mut patch = ResourcePatch::new(id, cell);
        patch.growth_timer =
            Some(self.schedule_repeating(TimerEvent::Growth(id), self.timing.growth_period));
        self.patches.insert(id, patch);
        self.patch_cells.insert(cell, id);
        debug!(
            "placing grass at cell {:?}, world position {}",
            cell,
            self.grid.cell_to_world(cell)
        );
        self.publish(SimEvent::PatchPlaced { id, cell });
        Some(id)
    }

    pub fn patch(&self, id: PatchId) -> Option<&ResourcePatch> {
        self.patches.get(&id)
    }

    pub fn patch_mut(&mut self, id: PatchId) -> Option<&mut ResourcePatch> {
        self.patches.get_mut(&id)
    }

    pub fn patches(&self) -> impl Iterator<Item = &ResourcePatch> {
        self.patches.values()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    pub fn patch_at(&self, cell: TilePos) -> Option<PatchId> {
        self.patch_cells.get(&cell).copied()
    }

    pub fn is_occupied(&self, cell: TilePos) -> bool {
        self.patch_cells.contains_key(&cell)
    }

    pub fn patch_position(&self, id: PatchId) -> Option<Vec2> {
        self.patches
            .get(&id)
            .map(|patch| self.grid.cell_to_world(patch.cell))
    }

    /// Eaten: back to stage 0 with a full growth period ahead.
    pub fn reset_patch(&mut self, id: PatchId) {
        let speed = self.speed.factor();
        if let Some(patch) = self.patches.get_mut(&id) {
            patch.reset_stage();
            if let Some(timer) = patch.growth_timer {
                self.timers.restart(timer, speed);
            }
        }
    }

    /// Closest patch at or above `min_stage`; ties keep the earliest patch.
    pub fn nearest_patch(&self, position: Vec2, min_stage: u8) -> Option<PatchId> {
        let mut nearest = None;
        let mut nearest_distance = f32::MAX;
        for patch in self.patches.values() {
            if patch.growth_stage() < min_stage {
                continue;
            }
            let distance = position.distance(self.grid.cell_to_world(patch.cell));
            if distance < nearest_distance {
                nearest_distance = distance;
                nearest = Some(patch.id);
            }
        }
        nearest
    }

    /// First patch whose centre lies within `radius` of `position`.
    pub fn patch_near(&self, position: Vec2, radius: f32) -> Option<PatchId> {
        self.patches
            .values()
            .find(|patch| position.distance(self.grid.cell_to_world(patch.cell)) < radius)
            .map(|patch| patch.id)
    }

    pub fn nearest_water_access(&self, position: Vec2) -> Option<Vec2> {
        self.grid.nearest_water_access(position)
    }

    pub(crate) fn schedule_repeating(&mut self, event: TimerEvent, period: f64) -> TimerId {
        let speed = self.speed.factor();
        self.timers
            .schedule_repeating(event, period, Pace::Scaled, speed)
    }

    pub(crate) fn schedule_once(&mut self, event: TimerEvent, delay: f64, pace: Pace) -> TimerId {
        let speed = self.speed.factor();
        self.timers.schedule_once(event, delay, pace, speed)
    }

    pub(crate) fn next_due_event(&mut self) -> Option<TimerEvent> {
        let speed = self.speed.factor();
        self.timers.pop_due(speed)
    }

    pub(crate) fn publish(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn open_world(width: u32, height: u32) -> World {
        World::new(WorldGrid::new(width, height, 16.0), Timing::default(), 0.1)
    }

    #[test]
    fn test_spawn_registers_agent_and_timers() {
        let mut world = open_world(10, 10);
        let before = world.timers.len();
        let id = world
            .spawn_agent("Deer", Vec2::new(40.0, 40.0), Sex::Male, 2)
            .unwrap();
        assert_eq!(world.agent_count(), 1);
        assert_eq!(world.timers.len(), before + 3);
        assert_eq!(world.agent(id).unwrap().vitals.age, 2);
        assert!(matches!(
            world.drain_events().as_slice(),
            [SimEvent::AgentSpawned { .. }]
        ));
    }

    #[test]
    fn test_unknown_species_is_an_error() {
        let mut world = open_world(4, 4);
        let result = world.spawn_agent("Wolf", Vec2::ZERO, Sex::Male, 1);
        assert!(matches!(result, Err(WorldError::UnknownSpecies(name)) if name == "Wolf"));
    }

    #[test]
    fn test_remove_agent_cancels_timers() {
        let mut world = open_world(4, 4);
        let before = world.timers.len();
        let id = world
            .spawn_agent("Deer", Vec2::new(8.0, 8.0), Sex::Female, 1)
            .unwrap();
        assert!(world.remove_agent(id).is_some());
        assert_eq!(world.timers.len(), before);
        assert!(world.agent(id).is_none());
        assert!(world.remove_agent(id).is_none());
    }

    #[test]
    fn test_place_patch_rejects_duplicates_and_water() {
        let grid = WorldGrid::from_rows(&["..~", "..."], 16.0).unwrap();
        let mut world = World::new(grid, Timing::default(), 0.1);
        let cell = TilePos::new(0, 0);
        let id = world.place_patch(cell).unwrap();
        assert_eq!(world.patch_at(cell), Some(id));
        assert_eq!(world.place_patch(cell), None);
        assert_eq!(world.place_patch(TilePos::new(2, 0)), None);
        assert_eq!(world.place_patch(TilePos::new(9, 9)), None);
        assert_eq!(world.patch_count(), 1);
    }

    #[test]
    fn test_nearest_patch_respects_min_stage() {
        let mut world = open_world(10, 10);
        let near = world.place_patch(TilePos::new(1, 1)).unwrap();
        let far = world.place_patch(TilePos::new(8, 8)).unwrap();
        world.patch_mut(far).unwrap().set_growth_stage(2);

        let origin = Vec2::new(0.0, 0.0);
        assert_eq!(world.nearest_patch(origin, 1), Some(far));
        assert_eq!(world.nearest_patch(origin, 0), Some(near));
        assert_eq!(world.nearest_patch(origin, 3), None);
    }

    #[test]
    fn test_set_speed_rescales_day() {
        let mut world = open_world(4, 4);
        world.timers.advance(120.0);
        assert!(world.set_speed(4.0).unwrap());
        let remaining = world.day_remaining().unwrap();
        assert!((remaining - 30.0).abs() < 1e-9);
        assert!(!world.set_speed(4.0).unwrap());
        assert!(world.set_speed(0.0).is_err());
        assert_eq!(world.speed_factor(), 4.0);
    }
}
