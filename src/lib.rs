pub mod clock;
pub mod components;
pub mod engine;
pub mod rng;
pub mod scenario;
pub mod scheduler;
pub mod snapshot;
pub mod spatial;
pub mod speed;
pub mod systems;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, RunStats, TickReport};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::{AgentId, PatchId, SimEvent, World};
