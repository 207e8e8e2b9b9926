#![allow(dead_code)]

use ai_core::{AgentId, Vec2};
use ai_perception::sandbox::{Aabb, BoxWorld};
use ai_perception::{BodyHandle, Owner, SensorEventRouter, ShapeRole, ShapeTag};
use ai_stealth::{AiManager, Species, SpeciesProfile, StealthConfig};

pub const DT: f32 = 1.0 / 60.0;
pub const TARGET_BODY: BodyHandle = BodyHandle(1);

/// Agent `n` owns body `1000 + n`.
pub fn body_of(id: AgentId) -> BodyHandle {
    BodyHandle(1000 + id.0)
}

/// Profiles that think on every update, so one update is one agent tick.
pub fn every_frame(species: Species) -> SpeciesProfile {
    SpeciesProfile {
        tick_interval_seconds: 0.0,
        tick_jitter: 0.0,
        ..SpeciesProfile::for_species(species)
    }
}

pub fn every_frame_config() -> StealthConfig {
    Species::ALL
        .into_iter()
        .fold(StealthConfig::default(), |config, species| {
            config.with_profile(species, every_frame(species))
        })
}

pub fn manager() -> AiManager {
    AiManager::new(every_frame_config()).expect("valid config")
}

pub fn spawn(manager: &mut AiManager, id: AgentId, species: Species, position: Vec2) {
    manager
        .spawn(id, species, body_of(id), position)
        .expect("built-in tree");
}

/// A long floor whose top is at `y = -0.5`, the feet of an agent standing at `y = 0`.
pub fn floor() -> BoxWorld {
    let mut world = BoxWorld::new();
    world.add_wall(
        BodyHandle(500),
        Aabb::new(Vec2::new(-100.0, -1.5), Vec2::new(100.0, -0.5)),
    );
    world
}

pub fn sensor(id: AgentId, role: ShapeRole) -> ShapeTag {
    ShapeTag::sensor(body_of(id), role, Owner::Agent(id))
}

pub fn hull(id: AgentId) -> ShapeTag {
    ShapeTag::solid(body_of(id), Owner::Agent(id))
}

pub fn player() -> ShapeTag {
    ShapeTag::solid(TARGET_BODY, Owner::Target)
}

pub fn harvest_zone() -> ShapeTag {
    ShapeTag::sensor(TARGET_BODY, ShapeRole::HarvestSensor, Owner::Target)
}

pub fn scenery(body: u64) -> ShapeTag {
    ShapeTag::solid(BodyHandle(body), Owner::Scenery)
}

/// Delivers `TargetSighted` to `id` through the router.
pub fn sight(manager: &mut AiManager, id: AgentId) {
    let mut router = SensorEventRouter::new();
    router.begin_contact(sensor(id, ShapeRole::VisionSensor), player());
    manager.end_physics_step(&mut router);
}

pub fn lose_sight(manager: &mut AiManager, id: AgentId) {
    let mut router = SensorEventRouter::new();
    router.end_contact(sensor(id, ShapeRole::VisionSensor), player());
    manager.end_physics_step(&mut router);
}
