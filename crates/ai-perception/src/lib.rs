//! Perception for 2D side-view agents.
//!
//! - [`physics`]: the narrow physics port perception consumes (ray casts, fixture tags).
//! - [`visibility`]: single-ray and cone line-of-sight queries.
//! - [`probe`]: wall and ledge guard rays.
//! - [`router`]: turns sensor contact callbacks into per-agent perception events.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod physics;
pub mod probe;
pub mod router;
pub mod sandbox;
pub mod visibility;

pub use physics::{
    BodyHandle, EmptyWorld, Owner, RayCaster, RayHit, RayResponse, ShapeRole, ShapeTag,
};
pub use probe::{StepProbe, StepReport};
pub use router::{
    classify_contact, ContactPhase, Delivery, MalformedContact, PerceptionEvent, PerceptionKind,
    PerceptionSink, Route, RouteStats, SensorEventRouter,
};
pub use visibility::{
    cast_at, cast_heading, cast_segment, scan_cone, ConeScan, HitKind, SolidPolicy, Visibility,
    VisibilityFilter, VisionCone,
};
