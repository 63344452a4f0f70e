use std::path::PathBuf;

use anyhow::Result;
use log::info;

use crate::{
    rng::{RngManager, SystemRng},
    snapshot::{SnapshotWriter, WorldSnapshot},
    world::{SimEvent, World},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Tick number after the step.
    pub tick: u64,
    pub events: Vec<SimEvent>,
}

/// Event totals over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub days: u64,
    pub births: u64,
    pub deaths: u64,
    pub removals: u64,
    pub matings: u64,
    pub patches_placed: u64,
}

impl RunStats {
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        for event in &report.events {
            match event {
                SimEvent::DayAdvanced { .. } => self.days += 1,
                SimEvent::AgentBorn { .. } => self.births += 1,
                SimEvent::AgentDied { .. } => self.deaths += 1,
                SimEvent::AgentRemoved { .. } => self.removals += 1,
                SimEvent::Mated { .. } => self.matings += 1,
                SimEvent::PatchPlaced { .. } => self.patches_placed += 1,
                SimEvent::SpeedChanged { .. }
                | SimEvent::AgentSpawned { .. }
                | SimEvent::MatePaired { .. } => {}
            }
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    /// Runs every system once in registration order, then advances time.
    pub fn step(&mut self, world: &mut World) -> Result<TickReport> {
        let current_tick = world.tick();
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = SystemContext {
                tick: current_tick,
                dt_seconds: world.dt_seconds(),
                speed_factor: world.speed_factor(),
                scenario_name: &self.settings.scenario_name,
            };
            system.run(&ctx, world, &mut rng_stream)?;
        }
        world.advance_time();
        if self.snapshot_writer.is_due(world.tick()) {
            let snapshot = WorldSnapshot::capture(world, &self.settings.scenario_name);
            self.snapshot_writer.maybe_write(&snapshot)?;
        }
        Ok(TickReport {
            tick: world.tick(),
            events: world.drain_events(),
        })
    }

    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<RunStats> {
        self.log_start(world, ticks);
        let mut stats = RunStats::default();
        for _ in 0..ticks {
            let report = self.step(world)?;
            stats.record(&report);
        }
        Ok(stats)
    }

    /// Like [`Engine::run`], handing a snapshot to `hook` after every tick.
    pub fn run_with_hook<F>(
        &mut self,
        world: &mut World,
        ticks: u64,
        mut hook: F,
    ) -> Result<RunStats>
    where
        F: FnMut(WorldSnapshot),
    {
        self.log_start(world, ticks);
        let mut stats = RunStats::default();
        for _ in 0..ticks {
            let report = self.step(world)?;
            stats.record(&report);
            hook(WorldSnapshot::capture(world, &self.settings.scenario_name));
        }
        Ok(stats)
    }

    fn log_start(&self, world: &World, ticks: u64) {
        info!(
            "running '{}' for {} ticks at {}x (seed {})",
            self.settings.scenario_name,
            ticks,
            world.speed_factor(),
            self.rng.seed()
        );
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub dt_seconds: f64,
    pub speed_factor: f32,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
