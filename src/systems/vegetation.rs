//! Grass growth, spreading and spontaneous spawning.

use log::debug;
use rand::Rng;

use crate::spatial::TilePos;
use crate::world::{PatchId, World};

/// One growth roll for a patch.
pub(crate) fn grow<R: Rng + ?Sized>(world: &mut World, id: PatchId, rng: &mut R) {
    let chance = world.timing().growth_chance.clamp(0.0, 1.0);
    let Some(patch) = world.patch_mut(id) else {
        return;
    };
    if rng.gen_bool(chance) && patch.grow() {
        debug!(
            "grass at {:?} grew to stage {}",
            patch.cell,
            patch.growth_stage()
        );
    }
}

/// Free walkable cells next to mature patches. A cell bordering several
/// mature patches appears once per patch, weighting the pick toward it.
pub fn spread_candidates(world: &World) -> Vec<TilePos> {
    let grid = world.grid();
    let mut candidates = Vec::new();
    for patch in world.patches().filter(|patch| patch.is_mature()) {
        for neighbor in grid.neighbors4(patch.cell) {
            if grid.is_walkable(neighbor) && !world.is_occupied(neighbor) {
                candidates.push(neighbor);
            }
        }
    }
    candidates
}

pub(crate) fn spread<R: Rng + ?Sized>(world: &mut World, rng: &mut R) -> Option<PatchId> {
    let candidates = spread_candidates(world);
    if candidates.is_empty() {
        debug!("no valid cells to spread grass");
        return None;
    }
    let cell = candidates[rng.gen_range(0..candidates.len())];
    world.place_patch(cell)
}

pub(crate) fn spawn<R: Rng + ?Sized>(world: &mut World, rng: &mut R) -> Option<PatchId> {
    let chance = world.timing().spawn_chance.clamp(0.0, 1.0);
    if !rng.gen_bool(chance) {
        return None;
    }
    let free: Vec<TilePos> = world
        .grid()
        .walkable_cells()
        .filter(|cell| !world.is_occupied(*cell))
        .collect();
    if free.is_empty() {
        debug!("no free cells to spawn grass");
        return None;
    }
    let cell = free[rng.gen_range(0..free.len())];
    world.place_patch(cell)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::spatial::WorldGrid;
    use crate::world::{Timing, World};

    fn world_from(rows: &[&str], timing: Timing) -> World {
        World::new(WorldGrid::from_rows(rows, 16.0).unwrap(), timing, 0.1)
    }

    #[test]
    fn test_grow_with_certain_chance() {
        let timing = Timing {
            growth_chance: 1.0,
            ..Timing::default()
        };
        let mut world = world_from(&["..."], timing);
        let id = world.place_patch(TilePos::new(0, 0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..5 {
            grow(&mut world, id, &mut rng);
        }
        assert_eq!(world.patch(id).unwrap().growth_stage(), 3);
    }

    #[test]
    fn test_grow_never_with_zero_chance() {
        let timing = Timing {
            growth_chance: 0.0,
            ..Timing::default()
        };
        let mut world = world_from(&["..."], timing);
        let id = world.place_patch(TilePos::new(1, 0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            grow(&mut world, id, &mut rng);
        }
        assert_eq!(world.patch(id).unwrap().growth_stage(), 0);
    }

    #[test]
    fn test_spread_only_from_mature_patches() {
        let mut world = world_from(&["...", "...", "..."], Timing::default());
        let seed = world.place_patch(TilePos::new(1, 1)).unwrap();
        assert!(spread_candidates(&world).is_empty());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(spread(&mut world, &mut rng), None);

        world.patch_mut(seed).unwrap().set_growth_stage(1);
        let candidates = spread_candidates(&world);
        assert_eq!(candidates.len(), 4);
        let placed = spread(&mut world, &mut rng).unwrap();
        let cell = world.patch(placed).unwrap().cell;
        assert_eq!(cell.distance(TilePos::new(1, 1)), 1.0);
        assert_eq!(world.patch(placed).unwrap().growth_stage(), 0);
    }

    #[test]
    fn test_spread_skips_water_blocked_and_occupied() {
        let mut world = world_from(&["#~.", "..."], Timing::default());
        let seed = world.place_patch(TilePos::new(1, 1)).unwrap();
        world.patch_mut(seed).unwrap().set_growth_stage(2);
        world.place_patch(TilePos::new(0, 1)).unwrap();

        // (1,0) is water, (0,1) already has grass.
        assert_eq!(spread_candidates(&world), vec![TilePos::new(2, 1)]);
    }

    #[test]
    fn test_spawn_fills_free_cell() {
        let timing = Timing {
            spawn_chance: 1.0,
            ..Timing::default()
        };
        let mut world = world_from(&[".#", "~."], timing);
        world.place_patch(TilePos::new(0, 0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let placed = spawn(&mut world, &mut rng).unwrap();
        assert_eq!(world.patch(placed).unwrap().cell, TilePos::new(1, 1));
        assert_eq!(spawn(&mut world, &mut rng), None);
    }
}
