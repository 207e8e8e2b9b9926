#![cfg(all(feature = "core", feature = "stealth"))]

use ai::core::{AgentId, Vec2};
use ai::perception::BodyHandle;
use ai::stealth::{Agent, Species, SpeciesProfile};

#[test]
fn agent_status_serializes_through_the_umbrella() {
    let agent = Agent::new(
        AgentId(3),
        Species::StationarySentinel,
        BodyHandle(3),
        SpeciesProfile::for_species(Species::StationarySentinel),
    )
    .at(Vec2::new(1.0, 2.0));

    let json = serde_json::to_value(agent.status()).expect("serializable");
    assert_eq!(json["id"], 3);
    assert_eq!(json["species"], "stationary-sentinel");
    assert_eq!(json["awareness"], "idle");
    assert_eq!(json["position"]["y"], 2.0);
    assert_eq!(json["stunned"], false);
}
