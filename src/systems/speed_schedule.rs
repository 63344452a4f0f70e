use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// A speed factor to apply at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedChangeAt {
    pub at_tick: u64,
    pub factor: f32,
}

/// Applies scripted speed changes, standing in for the speed buttons.
pub struct SpeedScheduleSystem {
    changes: Vec<SpeedChangeAt>,
    next: usize,
}

impl SpeedScheduleSystem {
    pub fn new(mut changes: Vec<SpeedChangeAt>) -> Self {
        changes.sort_by_key(|change| change.at_tick);
        Self { changes, next: 0 }
    }
}

impl System for SpeedScheduleSystem {
    fn name(&self) -> &str {
        "speed_schedule"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        while let Some(change) = self.changes.get(self.next) {
            if change.at_tick > ctx.tick {
                break;
            }
            if let Err(err) = world.set_speed(change.factor) {
                warn!("ignoring scheduled speed change at tick {}: {err}", change.at_tick);
            }
            self.next += 1;
        }
        Ok(())
    }
}
