//! Mate search, approach, mating and gestation.
//!
//! Only males search. A pairing is always recorded on both agents and is
//! released on both at once.

use log::{debug, info};
use rand::Rng;

use crate::components::{Activity, Pregnancy, Sex, StatusLabel};
use crate::scheduler::{Pace, TimerEvent};
use crate::world::{AgentId, SimEvent, World};

pub const MATE_SEARCH_RADIUS: f32 = 200.0;
/// A paired female stops once her mate is this close.
pub const MATE_HALT_RADIUS: f32 = 20.0;
pub const MATE_REACH: f32 = 5.0;
/// Simulated seconds a male waits before searching again after his path to
/// a mate was cut off.
pub const MATE_RETRY_SECONDS: f32 = 10.0;

/// Pairs a male with the first eligible female in registry order.
pub(crate) fn try_find_mate(world: &mut World, male_id: AgentId) -> Option<AgentId> {
    let season = world.season();
    let male = world.agent(male_id)?;
    if !male.is_alive()
        || male.gender != Sex::Male
        || male.mate.is_some()
        || male.mate_cooldown > 0.0
        || !male.can_breed()
        || male.breeding.season != season
    {
        return None;
    }

    let female = world
        .live_agents_of_species(&male.species)
        .find(|candidate| {
            candidate.gender == Sex::Female
                && candidate.mate.is_none()
                && candidate.can_breed()
                && !candidate.is_pregnant()
                && candidate.position.distance(male.position) <= MATE_SEARCH_RADIUS
        })
        .map(|candidate| (candidate.id, candidate.position));
    let (female_id, female_position) = female?;

    if let Some(female) = world.agent_mut(female_id) {
        female.mate = Some(male_id);
    }
    if let Some(male) = world.agent_mut(male_id) {
        male.mate = Some(female_id);
        male.target = Some(female_position);
        male.activity = Activity::Mating;
        info!("{} found a mate", male.name);
    }
    world.publish(SimEvent::MatePaired {
        male: male_id,
        female: female_id,
    });
    Some(female_id)
}

/// Halts a paired female once her mate is close, facing away from him.
/// Returns `true` while she is holding still.
pub(crate) fn hold_for_mate(world: &mut World, female_id: AgentId) -> bool {
    let Some(female) = world.agent(female_id) else {
        return false;
    };
    if female.gender != Sex::Female {
        return false;
    }
    let Some(male) = female.mate.and_then(|id| world.agent(id)) else {
        return false;
    };
    if !male.is_alive() {
        return false;
    }
    let away = female.position - male.position;
    if away.length() >= MATE_HALT_RADIUS {
        return false;
    }

    if let Some(female) = world.agent_mut(female_id) {
        female.halt();
        female.collides = false;
        female.activity = Activity::Mating;
        if away != glam::Vec2::ZERO {
            female.facing = away.y.atan2(away.x);
        }
    }
    true
}

/// Moves a paired male toward his mate's current position and mates on
/// contact. Terrain in the way ends the pairing.
pub(crate) fn approach_mate(world: &mut World, male_id: AgentId, dt: f32) {
    let factor = world.speed_factor();
    let Some(male) = world.agent(male_id) else {
        return;
    };
    let Some(mate_id) = male.mate else {
        return;
    };
    let mate = match world.agent(mate_id) {
        Some(mate) if mate.is_alive() => mate,
        _ => {
            debug!("{} lost track of its mate", male.name);
            world.release_mate(male_id);
            return;
        }
    };
    let mate_position = mate.position;
    let mate_pregnant = mate.is_pregnant();
    let offset = mate_position - male.position;

    if offset.length() < MATE_REACH {
        let mating_shown = male.label == Some(StatusLabel::Mating);
        if let Some(male) = world.agent_mut(male_id) {
            male.halt();
        }
        if !mate_pregnant {
            perform_mating(world, male_id);
        } else if !mating_shown {
            // Pregnant by the time he arrived; nothing left to do.
            world.release_mate(male_id);
        }
        return;
    }

    let next = {
        let direction = offset.normalize_or_zero();
        male.position + direction * male.speed * factor * dt
    };
    if !world.grid().is_walkable(world.grid().world_to_cell(next)) {
        debug!("{} cannot reach its mate", male.name);
        world.release_mate(male_id);
        if let Some(male) = world.agent_mut(male_id) {
            male.halt();
            male.mate_cooldown = MATE_RETRY_SECONDS;
        }
        return;
    }
    if let Some(male) = world.agent_mut(male_id) {
        let direction = offset.normalize_or_zero();
        male.target = Some(mate_position);
        male.turn_towards(direction, dt * factor);
        male.velocity = direction * male.speed * factor;
        male.position = next;
    }
}

/// Starts a pregnancy and schedules the end of the mating display.
pub(crate) fn perform_mating(world: &mut World, male_id: AgentId) -> bool {
    let Some(female_id) = world.agent(male_id).and_then(|male| male.mate) else {
        return false;
    };
    let eligible = world.agent(female_id).is_some_and(|female| {
        female.is_alive() && female.gender == Sex::Female && !female.is_pregnant()
    });
    if !eligible {
        return false;
    }

    if let Some(female) = world.agent_mut(female_id) {
        female.pregnancy = Some(Pregnancy {
            sire: male_id,
            progress_days: 0.0,
        });
    }
    for id in [male_id, female_id] {
        if let Some(agent) = world.agent_mut(id) {
            agent.collides = false;
            // A meal or drink in progress runs to completion.
            if agent.activity.is_feeding() {
                continue;
            }
            agent.label = Some(StatusLabel::Mating);
            agent.activity = Activity::Mating;
            agent.halt();
        }
    }

    let display = world.timing().mating_display;
    world.schedule_once(TimerEvent::ClearLabel(male_id), display, Pace::Fixed);
    world.schedule_once(TimerEvent::ClearLabel(female_id), display, Pace::Fixed);
    world.schedule_once(
        TimerEvent::EndMating {
            male: male_id,
            female: female_id,
        },
        display,
        Pace::Fixed,
    );
    info!(
        "{} mated with {}",
        display_name(world, male_id),
        display_name(world, female_id)
    );
    world.publish(SimEvent::Mated {
        male: male_id,
        female: female_id,
    });
    true
}

/// Deferred cleanup after the mating display: collision back on, pairing
/// cleared on both sides.
pub(crate) fn end_mating(world: &mut World, male_id: AgentId, female_id: AgentId) {
    for (id, partner) in [(male_id, female_id), (female_id, male_id)] {
        let Some(agent) = world.agent_mut(id) else {
            continue;
        };
        agent.collides = true;
        if agent.mate == Some(partner) {
            agent.mate = None;
        }
        if agent.activity == Activity::Mating {
            agent.activity = Activity::Idle;
        }
    }
}

pub(crate) fn clear_label(world: &mut World, id: AgentId) {
    if let Some(agent) = world.agent_mut(id) {
        if agent.label == Some(StatusLabel::Mating) {
            agent.label = None;
        }
    }
}

/// One day of gestation for every pregnant female; due mothers give birth.
pub(crate) fn advance_gestation<R: Rng + ?Sized>(world: &mut World, rng: &mut R) -> Vec<AgentId> {
    let mut due = Vec::new();
    for agent in world.agents.values_mut() {
        if !agent.is_alive() {
            continue;
        }
        let gestation = agent.breeding.gestation_days;
        if let Some(pregnancy) = agent.pregnancy.as_mut() {
            pregnancy.progress_days += 1.0;
            if pregnancy.progress_days >= gestation {
                due.push((agent.id, pregnancy.sire));
            }
        }
    }

    let mut born = Vec::new();
    for (mother, father) in due {
        let Some(agent) = world.agent_mut(mother) else {
            continue;
        };
        agent.pregnancy = None;
        let (min, max) = (agent.breeding.litter_min, agent.breeding.litter_max);
        let litter = if max > min { rng.gen_range(min..=max) } else { min };
        for _ in 0..litter {
            let gender = if rng.gen_bool(0.5) {
                Sex::Male
            } else {
                Sex::Female
            };
            if let Some(child) = world.spawn_offspring(mother, father, gender) {
                born.push(child);
            }
        }
        info!(
            "{} gave birth to {} offspring",
            display_name(world, mother),
            litter
        );
    }
    born
}

fn display_name(world: &World, id: AgentId) -> String {
    world
        .agent(id)
        .map(|agent| agent.name.clone())
        .unwrap_or_else(|| format!("agent {}", id.raw()))
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::world::tests::open_world;

    fn pair_world() -> (World, AgentId, AgentId) {
        let mut world = open_world(40, 40);
        let male = world
            .spawn_agent("Deer", Vec2::new(100.0, 100.0), Sex::Male, 5)
            .unwrap();
        let female = world
            .spawn_agent("Deer", Vec2::new(200.0, 200.0), Sex::Female, 5)
            .unwrap();
        (world, male, female)
    }

    #[test]
    fn test_pairing_is_symmetric() {
        let (mut world, male, female) = pair_world();
        assert_eq!(try_find_mate(&mut world, male), Some(female));
        assert_eq!(world.agent(male).unwrap().mate, Some(female));
        assert_eq!(world.agent(female).unwrap().mate, Some(male));
        assert_eq!(
            world.agent(male).unwrap().target,
            Some(Vec2::new(200.0, 200.0))
        );
        assert_eq!(try_find_mate(&mut world, male), None);
    }

    #[test]
    fn test_search_requires_breeding_season_and_age() {
        let (mut world, male, _) = pair_world();
        world.agent_mut(male).unwrap().vitals.age = 0;
        assert_eq!(try_find_mate(&mut world, male), None);

        world.agent_mut(male).unwrap().vitals.age = 3;
        for _ in 0..10 {
            world.clock_mut().advance_day();
        }
        assert_ne!(world.season(), crate::clock::Season::Summer);
        assert_eq!(try_find_mate(&mut world, male), None);
    }

    #[test]
    fn test_search_skips_distant_and_pregnant_females() {
        let (mut world, male, female) = pair_world();
        let far = world
            .spawn_agent("Deer", Vec2::new(500.0, 500.0), Sex::Female, 5)
            .unwrap();
        world.agent_mut(female).unwrap().pregnancy = Some(Pregnancy {
            sire: male,
            progress_days: 2.0,
        });
        assert_eq!(try_find_mate(&mut world, male), None);
        assert!(world.agent(far).unwrap().mate.is_none());
    }

    #[test]
    fn test_first_match_not_nearest() {
        let (mut world, male, first) = pair_world();
        let _closer = world
            .spawn_agent("Deer", Vec2::new(101.0, 100.0), Sex::Female, 5)
            .unwrap();
        assert_eq!(try_find_mate(&mut world, male), Some(first));
    }

    #[test]
    fn test_female_holds_when_mate_close() {
        let (mut world, male, female) = pair_world();
        try_find_mate(&mut world, male);
        assert!(!hold_for_mate(&mut world, female));

        world.agent_mut(male).unwrap().position = Vec2::new(190.0, 200.0);
        assert!(hold_for_mate(&mut world, female));
        let agent = world.agent(female).unwrap();
        assert_eq!(agent.activity, Activity::Mating);
        assert!(!agent.collides);
        assert_eq!(agent.facing, 0.0);
    }

    #[test]
    fn test_mating_cycle() {
        let (mut world, male, female) = pair_world();
        try_find_mate(&mut world, male);
        world.agent_mut(male).unwrap().position = Vec2::new(197.0, 200.0);

        approach_mate(&mut world, male, 0.1);
        let mother = world.agent(female).unwrap();
        assert!(mother.is_pregnant());
        assert_eq!(mother.label, Some(StatusLabel::Mating));
        assert_eq!(mother.pregnancy.unwrap().sire, male);

        clear_label(&mut world, female);
        end_mating(&mut world, male, female);
        for id in [male, female] {
            let agent = world.agent(id).unwrap();
            assert!(agent.mate.is_none());
            assert!(agent.collides);
            assert_eq!(agent.activity, Activity::Idle);
        }
        assert_eq!(world.agent(female).unwrap().label, None);
    }

    #[test]
    fn test_dead_mate_releases_pair() {
        let (mut world, male, female) = pair_world();
        try_find_mate(&mut world, male);
        world.agent_mut(female).unwrap().activity = Activity::Dead;
        approach_mate(&mut world, male, 0.1);
        assert!(world.agent(male).unwrap().mate.is_none());
        assert!(world.agent(female).unwrap().mate.is_none());
        assert_eq!(world.agent(male).unwrap().activity, Activity::Idle);
    }

    #[test]
    fn test_male_tracks_live_position() {
        let (mut world, male, female) = pair_world();
        try_find_mate(&mut world, male);
        world.agent_mut(female).unwrap().position = Vec2::new(100.0, 300.0);
        approach_mate(&mut world, male, 0.5);
        let agent = world.agent(male).unwrap();
        assert_eq!(agent.target, Some(Vec2::new(100.0, 300.0)));
        assert!((agent.position - Vec2::new(100.0, 110.0)).length() < 1e-4);
    }

    #[test]
    fn test_mating_leaves_drinking_female_drinking() {
        let (mut world, male, female) = pair_world();
        try_find_mate(&mut world, male);
        {
            let agent = world.agent_mut(female).unwrap();
            agent.vitals.thirst = 60.0;
            agent.speed = 0.0;
            agent.label = Some(StatusLabel::Drinking);
            agent.activity = Activity::Drinking { cooldown: 1.0 };
        }
        world.agent_mut(male).unwrap().position = Vec2::new(197.0, 200.0);

        approach_mate(&mut world, male, 0.1);
        let mother = world.agent(female).unwrap();
        assert!(mother.is_pregnant());
        assert_eq!(mother.activity, Activity::Drinking { cooldown: 1.0 });
        assert_eq!(mother.label, Some(StatusLabel::Drinking));
        assert!(!mother.collides);

        end_mating(&mut world, male, female);
        let mother = world.agent(female).unwrap();
        assert!(matches!(mother.activity, Activity::Drinking { .. }));
        assert!(mother.mate.is_none());
        assert!(mother.collides);
        assert_eq!(world.agent(male).unwrap().activity, Activity::Idle);
    }

    #[test]
    fn test_blocked_path_releases_pair() {
        let mut world = World::new(
            crate::spatial::WorldGrid::from_rows(&["....~.....", "....~....."], 16.0).unwrap(),
            crate::world::Timing::default(),
            0.1,
        );
        let male = world
            .spawn_agent("Deer", Vec2::new(60.0, 8.0), Sex::Male, 5)
            .unwrap();
        let female = world
            .spawn_agent("Deer", Vec2::new(100.0, 8.0), Sex::Female, 5)
            .unwrap();
        assert_eq!(try_find_mate(&mut world, male), Some(female));

        approach_mate(&mut world, male, 0.25);
        let agent = world.agent(male).unwrap();
        assert_eq!(agent.position, Vec2::new(60.0, 8.0));
        assert!(agent.mate.is_none());
        assert_eq!(agent.activity, Activity::Idle);
        assert!(world.agent(female).unwrap().mate.is_none());

        assert_eq!(try_find_mate(&mut world, male), None);
        world.agent_mut(male).unwrap().mate_cooldown = 0.0;
        assert_eq!(try_find_mate(&mut world, male), Some(female));
    }

    #[test]
    fn test_birth_after_gestation() {
        let (mut world, male, female) = pair_world();
        world.agent_mut(female).unwrap().pregnancy = Some(Pregnancy {
            sire: male,
            progress_days: 28.0,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(advance_gestation(&mut world, &mut rng).is_empty());
        let born = advance_gestation(&mut world, &mut rng);
        assert_eq!(born.len(), 1);

        let child = world.agent(born[0]).unwrap();
        assert_eq!(child.vitals.age, 0);
        assert_eq!(child.lineage.mother, Some(female));
        assert_eq!(child.lineage.father, Some(male));
        assert_eq!(child.position, Vec2::new(200.0, 200.0));
        assert!(!world.agent(female).unwrap().is_pregnant());
        assert_eq!(world.agent(female).unwrap().lineage.children, born);
        assert_eq!(world.agent(male).unwrap().lineage.children, born);
    }
}
