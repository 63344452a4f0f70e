use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use meadowsim::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    systems::{BehaviorSystem, LifecycleSystem, SpeedScheduleSystem, TimerSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Meadow ecosystem simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/meadow.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the starting speed factor
    #[arg(long)]
    speed: Option<f32>,

    /// Override snapshot interval in ticks (0 disables snapshots)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let mut scenario = loader.load(&cli.scenario)?;
    if let Some(speed) = cli.speed {
        scenario.speed = speed;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(scenario.logging.level.as_str()),
    )
    .init();

    let mut world = scenario.build_world()?;
    let ticks = scenario.ticks(cli.ticks);
    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_ticks);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_system(SpeedScheduleSystem::new(scenario.speed_changes.clone()))
        .with_system(LifecycleSystem::new())
        .with_system(TimerSystem::new())
        .with_system(BehaviorSystem::new())
        .build();

    let stats = engine.run(&mut world, ticks)?;
    info!("{:?}", stats);
    println!(
        "Scenario '{}' completed for {} ticks ({:.1} s simulated). {}. Living agents: {}, grass patches: {}, births: {}, deaths: {}",
        scenario.name,
        ticks,
        world.elapsed_seconds(),
        world.date(),
        world.live_agents().count(),
        world.patch_count(),
        stats.births,
        stats.deaths
    );
    Ok(())
}
