mod common;

use ai_core::{AgentId, Vec2};
use ai_perception::sandbox::{Aabb, BoxWorld};
use ai_perception::{BodyHandle, EmptyWorld, SensorEventRouter, ShapeRole};
use ai_stealth::{
    Agent, AiManager, AwarenessState, EconomyError, Facing, FearAction, NoTarget, RegisterError,
    Species, SpeciesProfile, StaticScene, StealthConfig,
};
use common::*;

#[test]
fn duplicate_registration_is_refused() {
    let mut m = manager();
    spawn(&mut m, AgentId(1), Species::PatrolFlee, Vec2::ZERO);
    let again = Agent::new(
        AgentId(1),
        Species::StationarySentinel,
        BodyHandle(5),
        SpeciesProfile::for_species(Species::StationarySentinel),
    );
    assert_eq!(
        m.register(again),
        Err(RegisterError::AlreadyRegistered(AgentId(1)))
    );
    assert_eq!(m.agent(AgentId(1)).map(|a| a.species()), Some(Species::PatrolFlee));
}

#[test]
fn unregister_is_idempotent_and_halts_the_tree() {
    let mut m = manager();
    spawn(&mut m, AgentId(1), Species::PatrolChaseAttack, Vec2::ZERO);
    m.update(DT, &EmptyWorld, &NoTarget);
    assert_eq!(m.active_leaves(AgentId(1)), vec!["patrol"]);

    let agent = m.unregister(AgentId(1)).expect("was registered");
    assert_eq!(agent.id(), AgentId(1));
    assert!(m.unregister(AgentId(1)).is_none());
    assert!(m.is_empty());
    assert_eq!(m.update(DT, &EmptyWorld, &NoTarget), 0);
}

#[test]
fn doomed_agent_still_receives_the_steps_contacts() {
    let mut m = manager();
    spawn(&mut m, AgentId(1), Species::PatrolChaseAttack, Vec2::ZERO);
    let mut router = SensorEventRouter::new();

    assert!(m.schedule_removal(AgentId(1)));
    assert!(!m.schedule_removal(AgentId(42)));
    router.begin_contact(sensor(AgentId(1), ShapeRole::VisionSensor), player());
    router.begin_contact(sensor(AgentId(1), ShapeRole::GroundSensor), scenery(500));

    let outcome = m.end_physics_step(&mut router);
    assert_eq!(outcome.routed.delivered, 2);
    assert_eq!(outcome.removed.len(), 1);
    let removed = &outcome.removed[0];
    assert!(removed.target_in_view());
    assert!(removed.is_grounded());
    assert_eq!(removed.awareness(), AwarenessState::Alerted);
    assert!(!m.contains(AgentId(1)));

    // Contacts arriving afterwards are stale.
    router.end_contact(sensor(AgentId(1), ShapeRole::VisionSensor), player());
    let outcome = m.end_physics_step(&mut router);
    assert_eq!(outcome.routed.stale, 1);
    assert!(outcome.removed.is_empty());
}

#[test]
fn agents_think_at_their_own_staggered_rate() {
    let mut m = AiManager::new(StealthConfig::default()).expect("valid config");
    let ids: Vec<AgentId> = (1..=20).map(AgentId).collect();
    for &id in &ids {
        spawn(&mut m, id, Species::PatrolChaseAttack, Vec2::ZERO);
    }

    let frames = 600;
    let mut busiest = 0;
    for _ in 0..frames {
        busiest = busiest.max(m.update(DT, &EmptyWorld, &NoTarget));
    }
    assert!(busiest < ids.len(), "agents should not all think on the same frame");

    let profile = SpeciesProfile::for_species(Species::PatrolChaseAttack);
    let mut intervals = Vec::new();
    for &id in &ids {
        let interval = m.think_interval(id).expect("registered");
        let base = profile.tick_interval_seconds;
        assert!((interval - base).abs() <= base * profile.tick_jitter + 1e-6);
        intervals.push(interval);

        // One decision per interval, rounded up to whole frames: 6 or 7 frames at 60 Hz.
        let thinks = m.think_count(id);
        assert!((80..=125).contains(&thinks), "{id}: {thinks} thinks");
    }
    intervals.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
    assert!(intervals.len() > 1, "intervals are jittered per agent");
}

#[test]
fn thinking_does_not_depend_on_frame_rate() {
    fn ticks_after(seconds: f32, dt: f32) -> u64 {
        let config = StealthConfig::default();
        let mut m = AiManager::new(config).expect("valid config");
        spawn(&mut m, AgentId(9), Species::StationarySentinel, Vec2::ZERO);
        let frames = (seconds / dt).round() as usize;
        for _ in 0..frames {
            m.update(dt, &EmptyWorld, &NoTarget);
        }
        m.think_count(AgentId(9))
    }

    let slow = ticks_after(10.0, 1.0 / 30.0);
    let fast = ticks_after(10.0, 1.0 / 240.0);
    let interval = SpeciesProfile::for_species(Species::StationarySentinel).tick_interval_seconds;
    let expected = 10.0 / interval;
    for thinks in [slow, fast] {
        let thinks = thinks as f32;
        assert!(thinks <= expected * 1.15 && thinks >= expected * 0.7, "{thinks} vs {expected}");
    }
}

#[test]
fn sentinel_fires_only_with_a_clear_line() {
    fn fired(with_wall: bool) -> usize {
        let sentinel = AgentId(5);
        let mut m = manager();
        spawn(&mut m, sentinel, Species::StationarySentinel, Vec2::ZERO);
        let mut world = floor();
        if with_wall {
            world.add_wall(
                BodyHandle(700),
                Aabb::new(Vec2::new(4.0, -0.5), Vec2::new(4.5, 3.0)),
            );
        }
        world.add_target(TARGET_BODY, Aabb::centered(Vec2::new(8.0, 0.0), Vec2::new(0.4, 0.9)));
        let scene = StaticScene::with_target(Vec2::new(8.0, 0.0), TARGET_BODY);

        sight(&mut m, sentinel);
        let mut shots = 0;
        for _ in 0..30 {
            m.update(DT, &world, &scene);
            shots += m.take_attack_requests().len();
        }
        let agent = m.agent(sentinel).expect("registered");
        assert_eq!(agent.awareness(), AwarenessState::AwareStationary);
        assert_eq!(agent.movement(), 0.0);
        shots
    }

    let clear = fired(false);
    assert!(clear >= 2, "cooldown allows repeated shots, got {clear}");
    assert_eq!(fired(true), 0);
}

#[test]
fn attack_requests_are_taken_once() {
    let sentinel = AgentId(5);
    let mut m = manager();
    spawn(&mut m, sentinel, Species::StationarySentinel, Vec2::ZERO);
    let mut world = floor();
    world.add_target(TARGET_BODY, Aabb::centered(Vec2::new(8.0, 0.0), Vec2::new(0.4, 0.9)));
    let scene = StaticScene::with_target(Vec2::new(8.0, 0.0), TARGET_BODY);
    sight(&mut m, sentinel);

    let mut first = Vec::new();
    while first.is_empty() && m.frame() < 30 {
        m.update(DT, &world, &scene);
        first = m.take_attack_requests();
    }
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].agent, sentinel);
    assert_eq!(first[0].facing, Facing::Right);
    assert!(m.take_attack_requests().is_empty());
}

#[test]
fn grounded_patrol_turns_back_at_a_ledge() {
    let guard = AgentId(2);
    let mut m = manager();
    spawn(&mut m, guard, Species::PatrolChaseAttack, Vec2::ZERO);
    let mut world = BoxWorld::new();
    world.add_wall(
        BodyHandle(500),
        Aabb::new(Vec2::new(-10.0, -1.5), Vec2::new(0.3, -0.5)),
    );

    let mut router = SensorEventRouter::new();
    router.begin_contact(sensor(guard, ShapeRole::GroundSensor), scenery(500));
    m.end_physics_step(&mut router);
    m.update(DT, &world, &NoTarget);

    let agent = m.agent(guard).expect("registered");
    assert!(agent.is_grounded());
    assert_eq!(agent.facing(), Facing::Left);
    assert_eq!(agent.movement(), -agent.profile().patrol_speed);
}

#[test]
fn patrol_leg_does_not_turn_on_a_wall_it_already_touches() {
    let guard = AgentId(2);
    let mut m = manager();
    spawn(&mut m, guard, Species::PatrolChaseAttack, Vec2::ZERO);

    let mut router = SensorEventRouter::new();
    router.begin_contact(sensor(guard, ShapeRole::WalkSensor), scenery(600));
    m.end_physics_step(&mut router);
    m.update(DT, &EmptyWorld, &NoTarget);
    let agent = m.agent(guard).expect("registered");
    assert!(agent.sees_wall());
    assert_eq!(agent.facing(), Facing::Right);
    assert!(agent.movement() > 0.0);

    // A new contact while patrolling still turns the agent.
    router.end_contact(sensor(guard, ShapeRole::WalkSensor), scenery(600));
    m.end_physics_step(&mut router);
    m.update(DT, &EmptyWorld, &NoTarget);
    assert_eq!(m.agent(guard).map(|a| a.facing()), Some(Facing::Right));

    router.begin_contact(sensor(guard, ShapeRole::WalkSensor), scenery(601));
    m.end_physics_step(&mut router);
    m.update(DT, &EmptyWorld, &NoTarget);
    assert_eq!(m.agent(guard).map(|a| a.facing()), Some(Facing::Left));
}

#[test]
fn flee_runs_away_once_alert() {
    let prey = AgentId(7);
    let mut m = manager();
    spawn(&mut m, prey, Species::PatrolFlee, Vec2::ZERO);
    let scene = StaticScene::with_target(Vec2::new(3.0, 0.0), TARGET_BODY);
    sight(&mut m, prey);

    let alert = SpeciesProfile::for_species(Species::PatrolFlee).alert_ticks;
    for _ in 0..alert {
        m.update(DT, &floor(), &scene);
    }
    let agent = m.agent(prey).expect("registered");
    assert_eq!(agent.awareness(), AwarenessState::AwareFleeing);
    assert_eq!(agent.movement(), -1.0);
    assert_eq!(agent.facing(), Facing::Left);
}

#[test]
fn stunned_ally_makes_prey_cower() {
    let prey = AgentId(7);
    let chaser = AgentId(8);
    let mut m = manager();
    spawn(&mut m, prey, Species::PatrolFlee, Vec2::ZERO);
    spawn(&mut m, chaser, Species::PatrolChaseAttack, Vec2::new(2.0, 0.0));

    m.update(DT, &EmptyWorld, &NoTarget);
    assert_eq!(m.active_leaves(prey), vec!["patrol"]);

    m.stun(chaser, 20).expect("registered");
    m.update(DT, &EmptyWorld, &NoTarget);
    assert_eq!(m.active_leaves(prey), vec!["cower-hold"]);
    assert_eq!(m.agent(prey).map(|a| a.movement()), Some(0.0));
}

#[test]
fn curious_prey_stares_at_points_of_interest() {
    let prey = AgentId(7);
    let profile = SpeciesProfile {
        stare_chance: 1.0,
        stare_ticks: 3,
        ..every_frame(Species::PatrolFlee)
    };
    let config = every_frame_config().with_profile(Species::PatrolFlee, profile);
    let mut m = AiManager::new(config).expect("valid config");
    spawn(&mut m, prey, Species::PatrolFlee, Vec2::ZERO);
    let scene = StaticScene::default().with_point_of_interest(Vec2::new(-2.0, 2.0));

    m.update(DT, &EmptyWorld, &scene);
    assert_eq!(m.active_leaves(prey), vec!["stare"]);
    let agent = m.agent(prey).expect("registered");
    assert_eq!(agent.movement(), 0.0);
    assert_eq!(agent.facing(), Facing::Left);
    assert!((agent.vision_heading() - 3.0 * std::f32::consts::FRAC_PI_4).abs() < 1e-4);
}

#[test]
fn alert_interrupting_a_stare_keeps_its_gaze_on_the_target() {
    let prey = AgentId(7);
    let profile = SpeciesProfile {
        stare_chance: 1.0,
        stare_ticks: 30,
        ..every_frame(Species::PatrolFlee)
    };
    let config = every_frame_config().with_profile(Species::PatrolFlee, profile);
    let mut m = AiManager::new(config).expect("valid config");
    spawn(&mut m, prey, Species::PatrolFlee, Vec2::ZERO);
    let target = Vec2::new(3.0, 2.0);
    let scene =
        StaticScene::with_target(target, TARGET_BODY).with_point_of_interest(Vec2::new(-2.0, 2.0));

    m.update(DT, &EmptyWorld, &scene);
    assert_eq!(m.active_leaves(prey), vec!["stare"]);

    sight(&mut m, prey);
    m.update(DT, &EmptyWorld, &scene);
    assert_eq!(m.active_leaves(prey), vec!["alert"]);
    let agent = m.agent(prey).expect("registered");
    assert_eq!(agent.awareness(), AwarenessState::Alerted);
    assert_eq!(agent.facing(), Facing::Right);
    assert!((agent.vision_heading() - target.angle()).abs() < 1e-4);
}

#[test]
fn harvest_needs_a_stunned_agent_in_the_zone() {
    let victim = AgentId(4);
    let mut m = manager().with_trace(true);
    spawn(&mut m, victim, Species::PatrolFlee, Vec2::ZERO);
    let mut reserve = m.config().fear_reserve().with_amount(50);

    assert_eq!(
        m.harvest(victim, &mut reserve),
        Err(EconomyError::NotHarvestable(victim))
    );
    assert_eq!(
        m.harvest(AgentId(99), &mut reserve),
        Err(EconomyError::UnknownAgent(AgentId(99)))
    );
    assert_eq!(reserve.amount(), 50);

    let mut router = SensorEventRouter::new();
    router.begin_contact(harvest_zone(), hull(victim));
    m.end_physics_step(&mut router);
    let left = m.stun_with(victim, &mut reserve).expect("affordable");
    assert_eq!(left, 40);
    assert!(m.agent(victim).expect("registered").is_stunned());

    let costs = m.config().fear;
    let after = m.harvest(victim, &mut reserve).expect("harvestable");
    assert_eq!(after, 40 - costs.harvest + costs.harvest_yield);
    assert!(m.is_scheduled_for_removal(victim));
    let tags = m.trace_log(victim).expect("tracing enabled").tags();
    assert!(tags.contains(&"stealth.harvested"));

    let outcome = m.end_physics_step(&mut router);
    assert_eq!(outcome.removed.len(), 1);
    assert!(!m.contains(victim));
}

#[test]
fn stun_is_refused_without_enough_fear() {
    let victim = AgentId(4);
    let mut m = manager();
    spawn(&mut m, victim, Species::PatrolChaseAttack, Vec2::ZERO);
    let mut reserve = m.config().fear_reserve().with_amount(5);

    let err = m.stun_with(victim, &mut reserve).expect_err("too poor");
    assert_eq!(
        err,
        EconomyError::Depleted {
            action: FearAction::Stun,
            cost: 10,
            available: 5
        }
    );
    assert_eq!(reserve.amount(), 5);
    assert!(!m.agent(victim).expect("registered").is_stunned());
}

#[test]
fn configured_fear_costs_price_the_stun() {
    let victim = AgentId(4);
    let json = r#"{ "fear": { "stun": 40 }, "fear_capacity": 60 }"#;
    let config = StealthConfig::from_json_str(json).expect("valid");
    let mut m = AiManager::new(config).expect("valid config");
    spawn(&mut m, victim, Species::PatrolChaseAttack, Vec2::ZERO);

    let mut reserve = m.config().fear_reserve();
    assert_eq!(reserve.capacity(), 60);
    assert_eq!(reserve.amount(), 60);
    assert_eq!(m.stun_with(victim, &mut reserve), Ok(20));
    assert_eq!(
        m.stun_with(victim, &mut reserve),
        Err(EconomyError::Depleted {
            action: FearAction::Stun,
            cost: 40,
            available: 20
        })
    );
}
