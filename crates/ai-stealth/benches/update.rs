use ai_core::{AgentId, Vec2};
use ai_perception::sandbox::{Aabb, BoxWorld};
use ai_perception::{BodyHandle, Owner, SensorEventRouter, ShapeRole, ShapeTag};
use ai_stealth::{AiManager, Species, StaticScene, StealthConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const AGENTS: u64 = 256;

fn level() -> BoxWorld {
    let mut world = BoxWorld::new();
    world.add_wall(
        BodyHandle(1),
        Aabb::new(Vec2::new(-300.0, -1.5), Vec2::new(300.0, -0.5)),
    );
    for i in 0..32u64 {
        let x = i as f32 * 16.0 - 256.0;
        world.add_wall(
            BodyHandle(100 + i),
            Aabb::new(Vec2::new(x, -0.5), Vec2::new(x + 0.5, 2.0)),
        );
    }
    world.add_target(
        BodyHandle(2),
        Aabb::centered(Vec2::new(0.0, 0.4), Vec2::new(0.4, 0.9)),
    );
    world
}

fn populated() -> AiManager {
    let mut manager = AiManager::new(StealthConfig::default()).expect("default config");
    let mut router = SensorEventRouter::new();
    for n in 0..AGENTS {
        let id = AgentId(n + 10);
        let species = Species::ALL[(n % 3) as usize];
        let x = n as f32 * 2.0 - AGENTS as f32;
        manager
            .spawn(id, species, BodyHandle(1000 + n), Vec2::new(x, 0.0))
            .expect("built-in tree");
        if n % 4 == 0 {
            router.begin_contact(
                ShapeTag::sensor(BodyHandle(1000 + n), ShapeRole::VisionSensor, Owner::Agent(id)),
                ShapeTag::solid(BodyHandle(2), Owner::Target),
            );
        }
    }
    manager.end_physics_step(&mut router);
    manager
}

fn bench_update(c: &mut Criterion) {
    let world = level();
    let scene = StaticScene::with_target(Vec2::new(0.0, 0.4), BodyHandle(2));
    let mut manager = populated();

    c.bench_function("ai-stealth/update(agents=256, dt=1/60)", |b| {
        b.iter(|| black_box(manager.update(1.0 / 60.0, &world, &scene)))
    });
}

criterion_group!(benches, bench_update);
criterion_main!(benches);
