use anyhow::Result;
use log::info;
use rand::Rng;

use crate::{
    components::{Activity, StatusLabel},
    engine::{System, SystemContext},
    rng::SystemRng,
    scheduler::{Pace, TimerEvent},
    systems::mating,
    world::{AgentId, SimEvent, World},
};

/// Death checks and carcass decay. Runs before anything else touches an
/// agent in a tick so the dead never act.
pub struct LifecycleSystem;

impl LifecycleSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LifecycleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for LifecycleSystem {
    fn name(&self) -> &str {
        "lifecycle"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for id in world.agent_ids() {
            let Some((activity, health)) = world
                .agent(id)
                .map(|agent| (agent.activity, agent.vitals.health))
            else {
                continue;
            };
            match activity {
                Activity::Decaying => {}
                Activity::Dead => decay(world, id),
                _ if health <= 0.0 => die(world, id),
                _ => {}
            }
        }
        Ok(())
    }
}

pub(crate) fn die(world: &mut World, id: AgentId) {
    world.release_mate(id);
    world.stop_needs(id);
    let Some(agent) = world.agent_mut(id) else {
        return;
    };
    agent.activity = Activity::Dead;
    agent.speed = 0.0;
    agent.halt();
    agent.label = Some(StatusLabel::Dead);
    agent.collides = false;
    agent.pregnancy = None;
    info!("{} has died", agent.name);
    world.publish(SimEvent::AgentDied { id });
}

/// One unit of meat per tick; an exhausted carcass becomes remains and is
/// scheduled for removal.
fn decay(world: &mut World, id: AgentId) {
    let Some(agent) = world.agent_mut(id) else {
        return;
    };
    agent.meat -= 1.0;
    if agent.meat > 0.0 {
        return;
    }
    agent.meat = 0.0;
    agent.activity = Activity::Decaying;
    let delay = world.timing().remains_delay;
    world.schedule_once(TimerEvent::RemoveRemains(id), delay, Pace::Scaled);
}

/// Day rollover: calendar, gestation, and a year of age on a new year.
pub(crate) fn on_day_end<R: Rng + ?Sized>(world: &mut World, rng: &mut R) {
    let advance = world.clock_mut().advance_day();
    info!("{}", advance.date);
    world.publish(SimEvent::DayAdvanced { date: advance.date });

    mating::advance_gestation(world, rng);

    if advance.new_year {
        for agent in world.agents.values_mut().filter(|agent| agent.is_alive()) {
            agent.vitals.age += 1;
        }
    }
}
