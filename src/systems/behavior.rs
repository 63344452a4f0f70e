//! Per-tick agent behaviour: eating and drinking countdowns, mate handling,
//! movement toward a target and the need-driven decision when idle.

use anyhow::Result;
use glam::Vec2;
use log::debug;
use rand::Rng;

use crate::{
    components::{Activity, Agent, Sex, StatusLabel},
    engine::{System, SystemContext},
    rng::SystemRng,
    spatial::{Terrain, WorldGrid},
    systems::mating,
    world::{AgentId, PatchId, World},
};

/// Thirst or hunger above this sends an agent looking for water or food.
pub const NEED_THRESHOLD: f32 = 20.0;
pub const ARRIVE_DISTANCE: f32 = 5.0;
/// In cells, Euclidean. Candidates further than this are rejected outright.
pub const WANDER_RADIUS: i32 = 10;
pub const WANDER_ATTEMPTS: usize = 20;
pub const CONTACT_RADIUS: f32 = 6.0;
pub const SIDESTEP: f32 = 10.0;
/// Simulated seconds.
pub const EAT_SECONDS: f32 = 3.0;
/// Tick seconds, not scaled by the speed factor.
pub const DRINK_INTERVAL: f32 = 1.0;
pub const DRINK_AMOUNT: f32 = 10.0;
const STATUS_INTERVAL: f32 = 5.0;

pub struct BehaviorSystem;

impl BehaviorSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BehaviorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BehaviorSystem {
    fn name(&self) -> &str {
        "behavior"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let dt = ctx.dt_seconds as f32;
        for id in world.agent_ids() {
            update_agent(world, id, dt, rng);
        }
        Ok(())
    }
}

fn update_agent<R: Rng + ?Sized>(world: &mut World, id: AgentId, dt: f32, rng: &mut R) {
    let factor = world.speed_factor();
    let Some(agent) = world.agent_mut(id) else {
        return;
    };
    if !agent.is_alive() {
        return;
    }
    report_status(agent, dt * factor);
    agent.mate_cooldown = (agent.mate_cooldown - dt * factor).max(0.0);

    let activity = agent.activity;
    match activity {
        Activity::Eating { patch, remaining } => {
            let remaining = remaining - dt * factor;
            if remaining > 0.0 {
                agent.activity = Activity::Eating { patch, remaining };
            } else {
                finish_eating(world, id, patch);
            }
            return;
        }
        Activity::Drinking { cooldown } => {
            drink(agent, cooldown - dt);
            return;
        }
        _ => {}
    }

    let gender = agent.gender;
    let paired = agent.mate.is_some();
    match gender {
        Sex::Female => {
            if paired && mating::hold_for_mate(world, id) {
                return;
            }
            if activity == Activity::Mating {
                if let Some(agent) = world.agent_mut(id) {
                    agent.activity = Activity::Idle;
                    agent.collides = true;
                }
            }
        }
        Sex::Male => {
            if paired {
                mating::approach_mate(world, id, dt);
                return;
            }
            if mating::try_find_mate(world, id).is_some() {
                return;
            }
        }
    }

    let has_target = world.agent(id).is_some_and(|agent| agent.target.is_some());
    if has_target {
        move_toward_target(world, id, dt, rng);
    } else {
        decide(world, id, rng);
    }
}

fn report_status(agent: &mut Agent, scaled_dt: f32) {
    agent.status_timer -= scaled_dt;
    if agent.status_timer > 0.0 {
        return;
    }
    agent.status_timer += STATUS_INTERVAL;
    debug!(
        "{} {}: hunger {:.2}, thirst {:.2}, energy {:.2}, health {:.2}",
        agent.gender,
        agent.name,
        agent.vitals.hunger,
        agent.vitals.thirst,
        agent.vitals.energy,
        agent.vitals.health
    );
}

/// Thirst goes first; food only when no water is reachable or not thirsty.
fn decide<R: Rng + ?Sized>(world: &mut World, id: AgentId, rng: &mut R) {
    let Some(agent) = world.agent(id) else {
        return;
    };
    let position = agent.position;
    let vitals = agent.vitals;

    if vitals.thirst > NEED_THRESHOLD {
        if let Some(water) = world.nearest_water_access(position) {
            set_course(world, id, water, Activity::MovingToWater);
            return;
        }
    }
    if vitals.hunger > NEED_THRESHOLD {
        let food = world
            .nearest_patch(position, 1)
            .and_then(|patch| world.patch_position(patch));
        if let Some(food) = food {
            set_course(world, id, food, Activity::MovingToFood);
            return;
        }
    }
    wander(world, id, rng);
}

fn set_course(world: &mut World, id: AgentId, target: Vec2, activity: Activity) {
    if let Some(agent) = world.agent_mut(id) {
        agent.target = Some(target);
        agent.activity = activity;
    }
}

fn wander<R: Rng + ?Sized>(world: &mut World, id: AgentId, rng: &mut R) {
    let Some(position) = world.agent(id).map(|agent| agent.position) else {
        return;
    };
    let target = pick_wander_target(world.grid(), position, rng);
    set_course(world, id, target, Activity::Wandering);
}

/// Random walkable cell centre within `WANDER_RADIUS` cells of `position`.
/// Falls back to `position` itself when every attempt is rejected.
pub fn pick_wander_target<R: Rng + ?Sized>(
    grid: &WorldGrid,
    position: Vec2,
    rng: &mut R,
) -> Vec2 {
    let origin = grid.world_to_cell(position);
    for _ in 0..WANDER_ATTEMPTS {
        let candidate = origin.offset(
            rng.gen_range(-WANDER_RADIUS..=WANDER_RADIUS),
            rng.gen_range(-WANDER_RADIUS..=WANDER_RADIUS),
        );
        if !grid.contains(candidate) || origin.distance(candidate) > WANDER_RADIUS as f32 {
            continue;
        }
        if grid.is_walkable(candidate) {
            return grid.cell_to_world(candidate);
        }
    }
    position
}

fn move_toward_target<R: Rng + ?Sized>(world: &mut World, id: AgentId, dt: f32, rng: &mut R) {
    let factor = world.speed_factor();
    let Some(agent) = world.agent(id) else {
        return;
    };
    let Some(target) = agent.target else {
        return;
    };
    let activity = agent.activity;
    let seeking_water = agent.going_for_drink();
    let position = agent.position;
    let offset = target - position;

    if offset.length() < ARRIVE_DISTANCE {
        arrive(world, id, target, activity, rng);
        return;
    }
    let direction = offset.normalize_or_zero();
    if direction == Vec2::ZERO {
        if let Some(agent) = world.agent_mut(id) {
            agent.target = None;
        }
        wander(world, id, rng);
        return;
    }

    let velocity = direction * agent.speed * factor;
    let next = position + velocity * dt;
    match world.grid().terrain_at(next) {
        Some(Terrain::Walkable) => {}
        Some(Terrain::Water) if seeking_water => {
            start_drinking(world, id);
            return;
        }
        Some(Terrain::Water) => {
            debug!("agent {} bumped into water", id.raw());
            wander(world, id, rng);
            return;
        }
        Some(Terrain::Blocked) | None => {
            wander(world, id, rng);
            return;
        }
    }

    if let Some(other) = find_contact(world, id, position, next) {
        resolve_contact(world, id, other, velocity, rng);
        return;
    }

    if let Some(agent) = world.agent_mut(id) {
        agent.velocity = velocity;
        agent.position = next;
        agent.turn_towards(direction, dt * factor);
    }
}

fn arrive<R: Rng + ?Sized>(
    world: &mut World,
    id: AgentId,
    target: Vec2,
    activity: Activity,
    rng: &mut R,
) {
    match activity {
        Activity::MovingToWater => start_drinking(world, id),
        Activity::MovingToFood => match world.patch_near(target, ARRIVE_DISTANCE) {
            Some(patch) => start_eating(world, id, patch),
            None => wander(world, id, rng),
        },
        _ => {
            if let Some(agent) = world.agent_mut(id) {
                agent.halt();
                agent.activity = Activity::Idle;
            }
        }
    }
}

/// Another colliding agent the step would move closer to and touch.
fn find_contact(world: &World, id: AgentId, from: Vec2, next: Vec2) -> Option<AgentId> {
    if !world.agent(id)?.collides {
        return None;
    }
    world
        .live_agents()
        .filter(|other| other.id != id && other.collides)
        .find(|other| {
            let gap = next.distance(other.position);
            gap < CONTACT_RADIUS && gap < from.distance(other.position)
        })
        .map(|other| other.id)
}

fn resolve_contact<R: Rng + ?Sized>(
    world: &mut World,
    id: AgentId,
    other_id: AgentId,
    velocity: Vec2,
    rng: &mut R,
) {
    let (Some(agent), Some(other)) = (world.agent(id), world.agent(other_id)) else {
        return;
    };

    if agent.mate == Some(other_id) {
        let facing = other.facing;
        if let Some(agent) = world.agent_mut(id) {
            agent.facing = facing;
            agent.velocity = Vec2::ZERO;
        }
        return;
    }

    if agent.velocity == Vec2::ZERO && other.velocity == Vec2::ZERO {
        // Eating, drinking or mating agents hold their ground.
        let other_roaming = other.activity.is_roaming();
        wander(world, id, rng);
        if other_roaming {
            wander(world, other_id, rng);
        }
        return;
    }

    // Detour to a point beside the other agent and walk there.
    let side = Vec2::new(-velocity.y, velocity.x).normalize_or_zero() * SIDESTEP;
    let detour = agent.position + side;
    if !world.grid().is_walkable(world.grid().world_to_cell(detour)) {
        wander(world, id, rng);
        return;
    }
    if let Some(agent) = world.agent_mut(id) {
        agent.target = Some(detour);
        agent.activity = Activity::Wandering;
        agent.velocity = velocity;
    }
}

fn start_eating(world: &mut World, id: AgentId, patch: PatchId) {
    if let Some(agent) = world.agent_mut(id) {
        agent.halt();
        agent.speed = 0.0;
        agent.label = Some(StatusLabel::Eating);
        agent.activity = Activity::Eating {
            patch,
            remaining: EAT_SECONDS,
        };
    }
}

fn finish_eating(world: &mut World, id: AgentId, patch: PatchId) {
    let food = world.patch(patch).map(|patch| patch.food_value()).unwrap_or(0.0);
    world.reset_patch(patch);
    if let Some(agent) = world.agent_mut(id) {
        agent.vitals.hunger = (agent.vitals.hunger - food).max(0.0);
        agent.restore_speed();
        agent.label = None;
        agent.activity = Activity::Idle;
        debug!("{} ate grass worth {}", agent.name, food);
    }
}

fn start_drinking(world: &mut World, id: AgentId) {
    if let Some(agent) = world.agent_mut(id) {
        agent.halt();
        agent.speed = 0.0;
        agent.label = Some(StatusLabel::Drinking);
        agent.activity = Activity::Drinking {
            cooldown: DRINK_INTERVAL,
        };
    }
}

fn drink(agent: &mut Agent, cooldown: f32) {
    if cooldown > 0.0 {
        agent.activity = Activity::Drinking { cooldown };
        return;
    }
    agent.vitals.thirst -= DRINK_AMOUNT;
    if agent.vitals.thirst <= 0.0 {
        agent.vitals.thirst = 0.0;
        agent.restore_speed();
        agent.label = None;
        agent.activity = Activity::Idle;
        debug!("{} finished drinking", agent.name);
    } else {
        agent.activity = Activity::Drinking {
            cooldown: cooldown + DRINK_INTERVAL,
        };
    }
}
