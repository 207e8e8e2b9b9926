//! Sensor event router.
//!
//! Physics contact callbacks are queued with [`SensorEventRouter::begin_contact`] /
//! [`SensorEventRouter::end_contact`] during the physics step and delivered in arrival order by
//! [`SensorEventRouter::flush`], before the owner of the sink removes any agent. Pairs are
//! classified by the roles and owners of the two fixtures:
//!
//! | sensor fixture         | other (solid) fixture | begin / end                             |
//! |------------------------|-----------------------|-----------------------------------------|
//! | vision, agent-owned    | target                | `TargetSighted` / `TargetLost`          |
//! | follow, agent-owned    | target                | `FollowRangeEnter` / `FollowRangeExit`  |
//! | walk, agent-owned      | scenery               | `WallContactBegin` / `WallContactEnd`   |
//! | ground, agent-owned    | scenery               | `GroundContactBegin` / `GroundContactEnd` |
//! | harvest, target-owned  | agent                 | `HarvestZoneEnter` / `HarvestZoneExit`  |
//!
//! Every other combination is ignored. Pairs with a missing owner, or a sensor owned by something
//! that cannot own it, are malformed: they are logged and dropped.

use std::fmt;
use std::ops::AddAssign;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ai_core::AgentId;

use crate::physics::{BodyHandle, Owner, ShapeRole, ShapeTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PerceptionKind {
    WallContactBegin,
    WallContactEnd,
    GroundContactBegin,
    GroundContactEnd,
    TargetSighted,
    TargetLost,
    FollowRangeEnter,
    FollowRangeExit,
    HarvestZoneEnter,
    HarvestZoneExit,
}

impl PerceptionKind {
    /// The sensor role whose contact count this event changes.
    pub fn sensor_role(self) -> ShapeRole {
        match self {
            Self::WallContactBegin | Self::WallContactEnd => ShapeRole::WalkSensor,
            Self::GroundContactBegin | Self::GroundContactEnd => ShapeRole::GroundSensor,
            Self::TargetSighted | Self::TargetLost => ShapeRole::VisionSensor,
            Self::FollowRangeEnter | Self::FollowRangeExit => ShapeRole::FollowSensor,
            Self::HarvestZoneEnter | Self::HarvestZoneExit => ShapeRole::HarvestSensor,
        }
    }

    pub fn is_begin(self) -> bool {
        matches!(
            self,
            Self::WallContactBegin
                | Self::GroundContactBegin
                | Self::TargetSighted
                | Self::FollowRangeEnter
                | Self::HarvestZoneEnter
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WallContactBegin => "wall_contact_begin",
            Self::WallContactEnd => "wall_contact_end",
            Self::GroundContactBegin => "ground_contact_begin",
            Self::GroundContactEnd => "ground_contact_end",
            Self::TargetSighted => "target_sighted",
            Self::TargetLost => "target_lost",
            Self::FollowRangeEnter => "follow_range_enter",
            Self::FollowRangeExit => "follow_range_exit",
            Self::HarvestZoneEnter => "harvest_zone_enter",
            Self::HarvestZoneExit => "harvest_zone_exit",
        }
    }

    fn pick(phase: ContactPhase, begin: Self, end: Self) -> Self {
        match phase {
            ContactPhase::Begin => begin,
            ContactPhase::End => end,
        }
    }
}

impl fmt::Display for PerceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantic perception signal addressed to one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerceptionEvent {
    pub agent: AgentId,
    pub kind: PerceptionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    Begin,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MalformedContact {
    MissingOwner {
        body: BodyHandle,
        role: ShapeRole,
    },
    UnexpectedOwner {
        body: BodyHandle,
        role: ShapeRole,
        owner: Owner,
    },
}

impl fmt::Display for MalformedContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOwner { body, role } => {
                write!(f, "{role:?} fixture of body {} has no owner", body.0)
            }
            Self::UnexpectedOwner { body, role, owner } => {
                write!(f, "{role:?} fixture of body {} is owned by {owner:?}", body.0)
            }
        }
    }
}

/// Classification of one contact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Event(PerceptionEvent),
    Ignored,
    Malformed(MalformedContact),
}

/// Maps a contact pair to at most one perception event. Fixture order does not matter.
pub fn classify_contact(phase: ContactPhase, a: &ShapeTag, b: &ShapeTag) -> Route {
    if let Err(malformed) = validate(a).and_then(|()| validate(b)) {
        return Route::Malformed(malformed);
    }
    match oriented(phase, a, b).or_else(|| oriented(phase, b, a)) {
        Some(event) => Route::Event(event),
        None => Route::Ignored,
    }
}

fn validate(shape: &ShapeTag) -> Result<(), MalformedContact> {
    let Some(owner) = shape.owner else {
        return Err(MalformedContact::MissingOwner {
            body: shape.body,
            role: shape.role,
        });
    };
    let expected = match shape.role {
        ShapeRole::Solid => true,
        ShapeRole::HarvestSensor => owner == Owner::Target,
        ShapeRole::GroundSensor
        | ShapeRole::VisionSensor
        | ShapeRole::FollowSensor
        | ShapeRole::WalkSensor => matches!(owner, Owner::Agent(_)),
    };
    if expected {
        Ok(())
    } else {
        Err(MalformedContact::UnexpectedOwner {
            body: shape.body,
            role: shape.role,
            owner,
        })
    }
}

fn oriented(phase: ContactPhase, sensor: &ShapeTag, other: &ShapeTag) -> Option<PerceptionEvent> {
    use PerceptionKind as K;

    if other.is_sensor || other.role != ShapeRole::Solid {
        return None;
    }
    let (agent, kind) = match (sensor.role, sensor.owner?, other.owner?) {
        (ShapeRole::VisionSensor, Owner::Agent(id), Owner::Target) => {
            (id, K::pick(phase, K::TargetSighted, K::TargetLost))
        }
        (ShapeRole::FollowSensor, Owner::Agent(id), Owner::Target) => {
            (id, K::pick(phase, K::FollowRangeEnter, K::FollowRangeExit))
        }
        (ShapeRole::WalkSensor, Owner::Agent(id), Owner::Scenery) => {
            (id, K::pick(phase, K::WallContactBegin, K::WallContactEnd))
        }
        (ShapeRole::GroundSensor, Owner::Agent(id), Owner::Scenery) => {
            (id, K::pick(phase, K::GroundContactBegin, K::GroundContactEnd))
        }
        (ShapeRole::HarvestSensor, Owner::Target, Owner::Agent(id)) => {
            (id, K::pick(phase, K::HarvestZoneEnter, K::HarvestZoneExit))
        }
        _ => return None,
    };
    Some(PerceptionEvent { agent, kind })
}

/// Whether an event reached a live agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The addressed agent is gone (stale back-reference).
    UnknownAgent,
}

/// Receiver of routed events, typically the AI manager.
pub trait PerceptionSink {
    fn deliver(&mut self, event: PerceptionEvent) -> Delivery;
}

impl PerceptionSink for Vec<PerceptionEvent> {
    fn deliver(&mut self, event: PerceptionEvent) -> Delivery {
        self.push(event);
        Delivery::Delivered
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteStats {
    pub delivered: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub stale: u64,
}

impl AddAssign for RouteStats {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.ignored += rhs.ignored;
        self.malformed += rhs.malformed;
        self.stale += rhs.stale;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedContact {
    phase: ContactPhase,
    a: ShapeTag,
    b: ShapeTag,
}

/// Queues raw contacts during a physics step and routes them afterwards.
#[derive(Debug, Default)]
pub struct SensorEventRouter {
    queue: Vec<QueuedContact>,
    totals: RouteStats,
}

impl SensorEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_contact(&mut self, a: ShapeTag, b: ShapeTag) {
        self.queue.push(QueuedContact {
            phase: ContactPhase::Begin,
            a,
            b,
        });
    }

    pub fn end_contact(&mut self, a: ShapeTag, b: ShapeTag) {
        self.queue.push(QueuedContact {
            phase: ContactPhase::End,
            a,
            b,
        });
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Counters accumulated over every flush.
    pub fn totals(&self) -> RouteStats {
        self.totals
    }

    /// Delivers every queued contact, in arrival order.
    pub fn flush(&mut self, sink: &mut dyn PerceptionSink) -> RouteStats {
        let mut stats = RouteStats::default();
        for contact in self.queue.drain(..) {
            match classify_contact(contact.phase, &contact.a, &contact.b) {
                Route::Event(event) => match sink.deliver(event) {
                    Delivery::Delivered => stats.delivered += 1,
                    Delivery::UnknownAgent => {
                        stats.stale += 1;
                        tracing::debug!(
                            agent = event.agent.stable_id(),
                            kind = %event.kind,
                            "perception event for unknown agent dropped"
                        );
                    }
                },
                Route::Ignored => {
                    stats.ignored += 1;
                    tracing::trace!(
                        a = ?contact.a.role,
                        b = ?contact.b.role,
                        "contact pair has no perception meaning"
                    );
                }
                Route::Malformed(reason) => {
                    stats.malformed += 1;
                    tracing::warn!(
                        phase = ?contact.phase,
                        %reason,
                        "malformed contact pair dropped"
                    );
                }
            }
        }
        self.totals += stats;
        stats
    }
}
