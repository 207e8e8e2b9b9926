//! Species tuning, loaded from JSON.
//!
//! Every field has a default, so a config file only lists what it changes. A species entry is
//! laid over that species' built-in profile ([`SpeciesProfile::for_species`]), nested objects
//! included: `{"vision": {"rays": 3}}` changes the ray count and nothing else.

use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_3, FRAC_PI_4, TAU};
use std::path::Path;

use ai_perception::{StepProbe, VisionCone};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::economy::{FearCosts, FearReserve};
use crate::error::ConfigError;
use crate::species::Species;

/// Vision cone and head movement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionProfile {
    /// Full opening angle in radians.
    pub fov: f32,
    pub rays: u16,
    pub range: f32,
    /// Maximum head rotation per agent tick, in radians.
    pub turn_rate: f32,
    /// Half-angle of the idle sweep around the facing direction.
    pub sweep: f32,
}

impl Default for VisionProfile {
    fn default() -> Self {
        Self {
            fov: FRAC_PI_3,
            rays: 7,
            range: 12.0,
            turn_rate: 0.35,
            sweep: 0.0,
        }
    }
}

impl VisionProfile {
    pub fn cone(&self, heading: f32) -> VisionCone {
        VisionCone {
            heading,
            fov: self.fov,
            rays: self.rays,
            range: self.range,
        }
    }
}

/// Tuning of one species. Durations are in agent ticks unless the name says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesProfile {
    /// World units per second at full movement intent.
    pub max_speed: f32,
    /// Movement intent used while patrolling, in `[0, 1]`.
    pub patrol_speed: f32,
    pub tick_interval_seconds: f32,
    /// Per-agent deviation of the tick interval, as a fraction of it.
    pub tick_jitter: f32,
    pub awareness_decay_ticks: u32,
    pub alert_ticks: u32,
    /// Stun length applied by [`crate::AiManager::stun_with`].
    pub stun_ticks: u32,
    pub attack_cooldown_ticks: u32,
    pub attack_range: f32,
    /// Length of one patrol leg before the tree re-plans; `0` patrols until interrupted.
    pub patrol_ticks: u32,
    pub vision: VisionProfile,
    pub step_probe: StepProbe,
    /// Radius in which a stunned ally frightens this agent.
    pub ally_radius: f32,
    /// Radius in which points of interest catch this agent's eye.
    pub curiosity_radius: f32,
    pub stare_chance: f32,
    pub stare_ticks: u32,
}

impl Default for SpeciesProfile {
    fn default() -> Self {
        Self {
            max_speed: 3.0,
            patrol_speed: 0.5,
            tick_interval_seconds: 0.1,
            tick_jitter: 0.1,
            awareness_decay_ticks: 30,
            alert_ticks: 5,
            stun_ticks: 30,
            attack_cooldown_ticks: 10,
            attack_range: 1.0,
            patrol_ticks: 40,
            vision: VisionProfile::default(),
            step_probe: StepProbe::default(),
            ally_radius: 6.0,
            curiosity_radius: 4.0,
            stare_chance: 0.0,
            stare_ticks: 0,
        }
    }
}

impl SpeciesProfile {
    /// Built-in tuning of each species.
    pub fn for_species(species: Species) -> Self {
        let base = Self::default();
        match species {
            Species::PatrolFlee => Self {
                max_speed: 4.0,
                patrol_speed: 0.4,
                tick_interval_seconds: 0.15,
                awareness_decay_ticks: 20,
                alert_ticks: 2,
                attack_cooldown_ticks: 0,
                attack_range: 0.0,
                patrol_ticks: 30,
                vision: VisionProfile {
                    fov: FRAC_PI_3,
                    rays: 5,
                    range: 8.0,
                    ..VisionProfile::default()
                },
                stare_chance: 0.25,
                stare_ticks: 12,
                ..base
            },
            Species::PatrolChaseAttack => base,
            Species::StationarySentinel => Self {
                max_speed: 0.0,
                patrol_speed: 0.0,
                tick_interval_seconds: 0.2,
                awareness_decay_ticks: 15,
                alert_ticks: 3,
                attack_cooldown_ticks: 8,
                attack_range: 14.0,
                patrol_ticks: 0,
                vision: VisionProfile {
                    fov: FRAC_PI_4,
                    rays: 9,
                    range: 14.0,
                    turn_rate: 0.2,
                    sweep: 0.6,
                },
                ally_radius: 0.0,
                curiosity_radius: 0.0,
                ..base
            },
        }
    }

    fn validate(&self, species: Species) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| ConfigError::InvalidProfile {
            species,
            field,
            reason: reason.to_string(),
        };
        let non_negative = |field: &'static str, value: f32| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(invalid(field, "must be a finite, non-negative number"))
            }
        };
        let unit = |field: &'static str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(invalid(field, "must be within [0, 1]"))
            }
        };

        non_negative("max_speed", self.max_speed)?;
        unit("patrol_speed", self.patrol_speed)?;
        non_negative("tick_interval_seconds", self.tick_interval_seconds)?;
        unit("tick_jitter", self.tick_jitter)?;
        non_negative("attack_range", self.attack_range)?;
        non_negative("ally_radius", self.ally_radius)?;
        non_negative("curiosity_radius", self.curiosity_radius)?;
        unit("stare_chance", self.stare_chance)?;
        non_negative("vision.range", self.vision.range)?;
        non_negative("vision.turn_rate", self.vision.turn_rate)?;
        non_negative("vision.sweep", self.vision.sweep)?;
        non_negative("step_probe.look_ahead", self.step_probe.look_ahead)?;
        non_negative("step_probe.foot_offset", self.step_probe.foot_offset)?;
        non_negative("step_probe.drop_tolerance", self.step_probe.drop_tolerance)?;
        if !(self.vision.fov > 0.0 && self.vision.fov <= TAU) {
            return Err(invalid("vision.fov", "must be within (0, 2π]"));
        }
        if self.vision.rays == 0 {
            return Err(invalid("vision.rays", "must be at least 1"));
        }
        Ok(())
    }
}

/// Top-level configuration of the agent subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StealthConfig {
    /// Seeds every per-agent random stream (tick phase, stare rolls).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Resolved profiles of the species the config mentions; missing species use
    /// [`SpeciesProfile::for_species`].
    #[serde(default, deserialize_with = "species_overrides")]
    pub species: BTreeMap<Species, SpeciesProfile>,

    #[serde(default)]
    pub fear: FearCosts,

    #[serde(default = "default_fear_capacity")]
    pub fear_capacity: u32,
}

type Profiles = BTreeMap<Species, SpeciesProfile>;

fn species_overrides<'de, D>(deserializer: D) -> Result<Profiles, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let overrides = BTreeMap::<Species, Value>::deserialize(deserializer)?;
    overrides
        .into_iter()
        .map(|(species, patch)| {
            let preset = SpeciesProfile::for_species(species);
            let mut merged = serde_json::to_value(preset).map_err(D::Error::custom)?;
            merge(&mut merged, patch);
            let profile = serde_json::from_value(merged)
                .map_err(|err| D::Error::custom(format!("{species}: {err}")))?;
            Ok((species, profile))
        })
        .collect()
}

/// Overlays `patch` onto `base`; objects merge key by key, anything else replaces.
fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, patch) => *base = patch,
    }
}

fn default_seed() -> u64 {
    0x5EED_0F_F3A2
}

fn default_fear_capacity() -> u32 {
    100
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            species: BTreeMap::new(),
            fear: FearCosts::default(),
            fear_capacity: default_fear_capacity(),
        }
    }
}

impl StealthConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (species, profile) in &self.species {
            profile.validate(*species)?;
        }
        Ok(())
    }

    pub fn profile(&self, species: Species) -> SpeciesProfile {
        self.species
            .get(&species)
            .cloned()
            .unwrap_or_else(|| SpeciesProfile::for_species(species))
    }

    /// A full fear reserve with the configured capacity and costs.
    pub fn fear_reserve(&self) -> FearReserve {
        FearReserve::new(self.fear_capacity, self.fear)
    }

    /// Replaces one species' profile.
    pub fn with_profile(mut self, species: Species, profile: SpeciesProfile) -> Self {
        self.species.insert(species, profile);
        self
    }
}
