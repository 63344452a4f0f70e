//! Recurring hunger, thirst and energy updates for a single agent.

use crate::components::{clamp_stat, Activity, Agent, STAT_MAX};
use crate::world::{AgentId, World};

/// Below this energy an agent crawls at a fifth of its base speed.
const LOW_ENERGY: f32 = 30.0;
const RECOVERY_CEILING: f32 = 30.0;
const STARVING_ENERGY_COST: f32 = 5.0;

pub(crate) fn on_hunger(world: &mut World, id: AgentId) {
    let speed = world.speed_factor();
    let Some(agent) = live_agent(world, id) else {
        return;
    };
    let vitals = &mut agent.vitals;
    vitals.hunger = clamp_stat(vitals.hunger + speed);
    if vitals.hunger >= STAT_MAX {
        vitals.energy = clamp_stat(vitals.energy - STARVING_ENERGY_COST * speed);
    }
}

/// The increment is one point per tick of the timer regardless of speed;
/// only the period shrinks.
pub(crate) fn on_thirst(world: &mut World, id: AgentId) {
    let speed = world.speed_factor();
    let Some(agent) = live_agent(world, id) else {
        return;
    };
    let vitals = &mut agent.vitals;
    vitals.thirst = clamp_stat(vitals.thirst + 1.0);
    if vitals.thirst >= STAT_MAX {
        vitals.energy = clamp_stat(vitals.energy - STARVING_ENERGY_COST * speed);
    }
}

pub(crate) fn on_energy(world: &mut World, id: AgentId) {
    let speed = world.speed_factor();
    let Some(agent) = live_agent(world, id) else {
        return;
    };
    // Eating and drinking hold the agent still; leave its speed alone.
    let stationary = matches!(
        agent.activity,
        Activity::Eating { .. } | Activity::Drinking { .. }
    );
    let base_speed = agent.traits.base_speed;
    let vitals = &mut agent.vitals;

    let mut movement = base_speed * (vitals.energy / STAT_MAX);
    if vitals.hunger >= STAT_MAX {
        vitals.energy += speed;
    }
    if vitals.thirst >= STAT_MAX {
        vitals.energy -= speed;
    }
    if vitals.energy <= 0.0 {
        vitals.health -= speed;
    }
    if vitals.thirst <= RECOVERY_CEILING && vitals.hunger <= RECOVERY_CEILING {
        vitals.energy += speed;
    }
    if vitals.energy < LOW_ENERGY {
        movement = base_speed * 0.2;
    } else {
        vitals.health += speed;
    }
    vitals.clamp();

    if !stationary {
        agent.speed = movement;
    }
}

fn live_agent(world: &mut World, id: AgentId) -> Option<&mut Agent> {
    world.agent_mut(id).filter(|agent| agent.is_alive())
}
