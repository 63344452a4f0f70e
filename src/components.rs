use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::clock::Season;
use crate::scheduler::TimerId;
use crate::spatial::TilePos;
use crate::world::{AgentId, PatchId};

pub const STAT_MAX: f32 = 100.0;
pub const MAX_GROWTH_STAGE: u8 = 3;

pub fn clamp_stat(value: f32) -> f32 {
    value.clamp(0.0, STAT_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => f.write_str("Male"),
            Sex::Female => f.write_str("Female"),
        }
    }
}

/// Primary behavioural mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activity {
    Idle,
    Wandering,
    MovingToFood,
    /// Heading for a water-access cell to drink.
    MovingToWater,
    Eating { patch: PatchId, remaining: f32 },
    Drinking { cooldown: f32 },
    Mating,
    Dead,
    Decaying,
}

impl Activity {
    /// Walking or about to pick a target; safe to send somewhere else.
    pub fn is_roaming(&self) -> bool {
        matches!(
            self,
            Activity::Idle | Activity::Wandering | Activity::MovingToFood | Activity::MovingToWater
        )
    }

    pub fn is_feeding(&self) -> bool {
        matches!(self, Activity::Eating { .. } | Activity::Drinking { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::Wandering => "wandering",
            Activity::MovingToFood => "moving_to_food",
            Activity::MovingToWater => "moving_to_water",
            Activity::Eating { .. } => "eating",
            Activity::Drinking { .. } => "drinking",
            Activity::Mating => "mating",
            Activity::Dead => "dead",
            Activity::Decaying => "decaying",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusLabel {
    Eating,
    Drinking,
    Mating,
    Dead,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StatusLabel::Eating => "*Eating*",
            StatusLabel::Drinking => "*Drinking*",
            StatusLabel::Mating => "*Mating*",
            StatusLabel::Dead => "*DEAD*",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub age: u32,
    pub health: f32,
    pub hunger: f32,
    pub thirst: f32,
    pub energy: f32,
}

impl Vitals {
    pub fn clamp(&mut self) {
        self.health = clamp_stat(self.health);
        self.hunger = clamp_stat(self.hunger);
        self.thirst = clamp_stat(self.thirst);
        self.energy = clamp_stat(self.energy);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub bravery: f32,
    pub aggression: f32,
    pub awareness: f32,
    pub social: f32,
    pub base_size: f32,
    pub base_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breeding {
    pub min_age: u32,
    pub season: Season,
    pub litter_min: u32,
    pub litter_max: u32,
    pub gestation_days: f64,
}

fn default_meat_per_size() -> f32 {
    750.0
}

/// Species-level defaults and reproduction rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    pub name: String,
    pub vitals: Vitals,
    pub traits: Traits,
    #[serde(default = "default_meat_per_size")]
    pub meat_per_size: f32,
    pub breeding: Breeding,
}

impl SpeciesProfile {
    pub fn deer() -> Self {
        Self {
            name: "Deer".to_string(),
            vitals: Vitals {
                age: 0,
                health: 100.0,
                hunger: 0.0,
                thirst: 0.0,
                energy: 50.0,
            },
            traits: Traits {
                bravery: 20.0,
                aggression: 10.0,
                awareness: 70.0,
                social: 50.0,
                base_size: 1.0,
                base_speed: 20.0,
            },
            meat_per_size: default_meat_per_size(),
            breeding: Breeding {
                min_age: 1,
                season: Season::Summer,
                litter_min: 1,
                litter_max: 1,
                gestation_days: 30.0,
            },
        }
    }

    pub fn meat_at_death(&self) -> f32 {
        self.meat_per_size * self.traits.base_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pregnancy {
    pub sire: AgentId,
    pub progress_days: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Lineage {
    pub mother: Option<AgentId>,
    pub father: Option<AgentId>,
    pub children: Vec<AgentId>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct NeedTimers {
    pub hunger: TimerId,
    pub thirst: TimerId,
    pub energy: TimerId,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub species: String,
    pub name: String,
    pub gender: Sex,
    pub vitals: Vitals,
    pub traits: Traits,
    pub breeding: Breeding,
    pub meat: f32,
    pub position: Vec2,
    pub target: Option<Vec2>,
    pub velocity: Vec2,
    /// Current movement speed before the global factor is applied.
    pub speed: f32,
    /// Facing angle in radians.
    pub facing: f32,
    pub activity: Activity,
    pub label: Option<StatusLabel>,
    pub collides: bool,
    pub mate: Option<AgentId>,
    pub pregnancy: Option<Pregnancy>,
    pub lineage: Lineage,
    pub(crate) timers: Option<NeedTimers>,
    pub(crate) status_timer: f32,
    /// Simulated seconds before a male searches for a mate again.
    pub(crate) mate_cooldown: f32,
}

impl Agent {
    pub fn new(
        id: AgentId,
        profile: &SpeciesProfile,
        position: Vec2,
        gender: Sex,
        age: u32,
    ) -> Self {
        let mut vitals = profile.vitals;
        vitals.age = age;
        Self {
            id,
            species: profile.name.clone(),
            name: format!("{} {}", profile.name, id.raw()),
            gender,
            vitals,
            traits: profile.traits,
            breeding: profile.breeding,
            meat: profile.meat_at_death(),
            position,
            target: None,
            velocity: Vec2::ZERO,
            speed: profile.traits.base_speed,
            facing: 0.0,
            activity: Activity::Idle,
            label: None,
            collides: true,
            mate: None,
            pregnancy: None,
            lineage: Lineage::default(),
            timers: None,
            status_timer: 5.0,
            mate_cooldown: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.activity, Activity::Dead | Activity::Decaying)
    }

    pub fn has_decayed(&self) -> bool {
        self.activity == Activity::Decaying
    }

    pub fn is_pregnant(&self) -> bool {
        self.pregnancy.is_some()
    }

    pub fn pregnancy_progress(&self) -> f64 {
        self.pregnancy.map(|p| p.progress_days).unwrap_or(0.0)
    }

    pub fn can_breed(&self) -> bool {
        self.vitals.age >= self.breeding.min_age
    }

    pub fn going_for_drink(&self) -> bool {
        self.activity == Activity::MovingToWater
    }

    /// Sprite frame for the presentation layer: 0 male, 1 female, 2 carcass,
    /// 3 remains.
    pub fn visual_stage(&self) -> u8 {
        match (self.activity, self.gender) {
            (Activity::Decaying, _) => 3,
            (Activity::Dead, _) => 2,
            (_, Sex::Male) => 0,
            (_, Sex::Female) => 1,
        }
    }

    /// Stops and drops any movement goal.
    pub fn halt(&mut self) {
        self.velocity = Vec2::ZERO;
        self.target = None;
    }

    pub fn restore_speed(&mut self) {
        self.speed = self.traits.base_speed;
    }

    /// Eases the facing angle toward `direction`.
    pub fn turn_towards(&mut self, direction: Vec2, delta: f32) {
        if direction == Vec2::ZERO {
            return;
        }
        let target = direction.y.atan2(direction.x);
        self.facing = lerp_angle(self.facing, target, (5.0 * delta).min(1.0));
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Species: {}, Health: {:.2}, Hunger: {:.2}, Thirst: {:.2}, Speed: {}, Bravery: {}",
            self.name,
            self.species,
            self.vitals.health,
            self.vitals.hunger,
            self.vitals.thirst,
            self.traits.base_speed,
            self.traits.bravery
        )
    }
}

fn lerp_angle(from: f32, to: f32, weight: f32) -> f32 {
    use std::f32::consts::TAU;
    let difference = (to - from) % TAU;
    let shortest = (2.0 * difference) % TAU - difference;
    from + shortest * weight
}

/// A patch of grass on one grid cell.
#[derive(Debug, Clone)]
pub struct ResourcePatch {
    pub id: PatchId,
    pub cell: TilePos,
    stage: u8,
    pub(crate) growth_timer: Option<TimerId>,
}

impl ResourcePatch {
    pub fn new(id: PatchId, cell: TilePos) -> Self {
        Self {
            id,
            cell,
            stage: 0,
            growth_timer: None,
        }
    }

    pub fn growth_stage(&self) -> u8 {
        self.stage
    }

    pub fn set_growth_stage(&mut self, stage: u8) {
        self.stage = stage.min(MAX_GROWTH_STAGE);
    }

    /// Returns `true` when the stage advanced.
    pub fn grow(&mut self) -> bool {
        if self.stage < MAX_GROWTH_STAGE {
            self.stage += 1;
            true
        } else {
            false
        }
    }

    pub fn is_mature(&self) -> bool {
        self.stage >= 1
    }

    /// Hunger removed by eating this patch at its current stage.
    pub fn food_value(&self) -> f32 {
        match self.stage {
            1 => 5.0,
            2 => 10.0,
            3 => 20.0,
            _ => 0.0,
        }
    }

    pub(crate) fn reset_stage(&mut self) {
        self.stage = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doe() -> Agent {
        Agent::new(
            AgentId::from_raw(1),
            &SpeciesProfile::deer(),
            Vec2::new(10.0, 10.0),
            Sex::Female,
            3,
        )
    }

    #[test]
    fn test_deer_defaults() {
        let agent = doe();
        assert_eq!(agent.species, "Deer");
        assert_eq!(agent.vitals.age, 3);
        assert_eq!(agent.vitals.energy, 50.0);
        assert_eq!(agent.meat, 750.0);
        assert_eq!(agent.speed, 20.0);
        assert!(agent.can_breed());
        assert!(agent.is_alive());
    }

    #[test]
    fn test_visual_stage() {
        let mut agent = doe();
        assert_eq!(agent.visual_stage(), 1);
        agent.gender = Sex::Male;
        assert_eq!(agent.visual_stage(), 0);
        agent.activity = Activity::Dead;
        assert_eq!(agent.visual_stage(), 2);
        agent.activity = Activity::Decaying;
        assert_eq!(agent.visual_stage(), 3);
        assert!(agent.has_decayed());
    }

    #[test]
    fn test_vitals_clamp() {
        let mut vitals = doe().vitals;
        vitals.hunger = 140.0;
        vitals.energy = -3.0;
        vitals.clamp();
        assert_eq!(vitals.hunger, 100.0);
        assert_eq!(vitals.energy, 0.0);
    }

    #[test]
    fn test_patch_growth_caps_at_max() {
        let mut patch = ResourcePatch::new(PatchId::from_raw(0), TilePos::new(1, 1));
        assert!(!patch.is_mature());
        assert!(patch.grow());
        assert!(patch.grow());
        assert!(patch.grow());
        assert!(!patch.grow());
        assert_eq!(patch.growth_stage(), MAX_GROWTH_STAGE);

        patch.set_growth_stage(9);
        assert_eq!(patch.growth_stage(), MAX_GROWTH_STAGE);
    }

    #[test]
    fn test_food_value_by_stage() {
        let mut patch = ResourcePatch::new(PatchId::from_raw(0), TilePos::new(1, 1));
        let values: Vec<f32> = (0..=3)
            .map(|stage| {
                patch.set_growth_stage(stage);
                patch.food_value()
            })
            .collect();
        assert_eq!(values, vec![0.0, 5.0, 10.0, 20.0]);
    }

    #[test]
    fn test_turn_towards_eases() {
        let mut agent = doe();
        agent.turn_towards(Vec2::new(0.0, 1.0), 0.1);
        assert!(agent.facing > 0.0 && agent.facing < std::f32::consts::FRAC_PI_2);
        agent.turn_towards(Vec2::ZERO, 0.1);
        let before = agent.facing;
        agent.turn_towards(Vec2::ZERO, 0.1);
        assert_eq!(agent.facing, before);
    }
}
