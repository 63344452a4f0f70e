use anyhow::Result;
use log::info;

use crate::{
    components::Activity,
    engine::{System, SystemContext},
    rng::SystemRng,
    scheduler::TimerEvent,
    systems::{lifecycle, mating, needs, vegetation},
    world::World,
};

/// Fires every timer that has come due this tick, in fire-time order.
pub struct TimerSystem;

impl TimerSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimerSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TimerSystem {
    fn name(&self) -> &str {
        "timers"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        while let Some(event) = world.next_due_event() {
            dispatch(world, event, rng);
        }
        Ok(())
    }
}

fn dispatch(world: &mut World, event: TimerEvent, rng: &mut SystemRng<'_>) {
    match event {
        TimerEvent::Hunger(id) => needs::on_hunger(world, id),
        TimerEvent::Thirst(id) => needs::on_thirst(world, id),
        TimerEvent::Energy(id) => needs::on_energy(world, id),
        TimerEvent::Growth(id) => vegetation::grow(world, id, rng),
        TimerEvent::SpreadGrass => {
            vegetation::spread(world, rng);
        }
        TimerEvent::SpawnGrass => {
            vegetation::spawn(world, rng);
        }
        TimerEvent::DayEnd => lifecycle::on_day_end(world, rng),
        TimerEvent::RemoveRemains(id) => {
            let decayed = world
                .agent(id)
                .is_some_and(|agent| agent.activity == Activity::Decaying);
            if decayed {
                if let Some(agent) = world.remove_agent(id) {
                    info!("remains of {} removed", agent.name);
                }
            }
        }
        TimerEvent::ClearLabel(id) => mating::clear_label(world, id),
        TimerEvent::EndMating { male, female } => mating::end_mating(world, male, female),
    }
}
