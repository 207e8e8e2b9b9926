//! Data-driven species trees.
//!
//! A [`TreeDef`] names leaves from the built-in leaf library and is compiled into a shared
//! [`StealthTemplate`]. Trees can be loaded from JSON:
//!
//! ```json
//! { "node": "selector", "name": "root", "children": [
//!     { "node": "reactive-sequence", "children": [
//!         { "node": "condition", "leaf": "alert-complete" },
//!         { "node": "action", "leaf": "flee" } ] },
//!     { "node": "action", "leaf": "patrol", "params": { "ticks": 60 } } ] }
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use ai_bt::BtTemplate;
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::leaves;
use crate::ports::{StealthNode, StealthTemplate};
use crate::species::Species;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "kebab-case")]
pub enum TreeDef {
    Sequence {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        children: Vec<TreeDef>,
    },
    ReactiveSequence {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        children: Vec<TreeDef>,
    },
    Selector {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        children: Vec<TreeDef>,
    },
    Condition {
        leaf: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        params: BTreeMap<String, f32>,
    },
    Action {
        leaf: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        params: BTreeMap<String, f32>,
    },
}

impl TreeDef {
    pub fn sequence(name: &str, children: Vec<TreeDef>) -> Self {
        TreeDef::Sequence {
            name: Some(name.to_string()),
            children,
        }
    }

    pub fn reactive_sequence(name: &str, children: Vec<TreeDef>) -> Self {
        TreeDef::ReactiveSequence {
            name: Some(name.to_string()),
            children,
        }
    }

    pub fn selector(name: &str, children: Vec<TreeDef>) -> Self {
        TreeDef::Selector {
            name: Some(name.to_string()),
            children,
        }
    }

    pub fn condition(leaf: &str) -> Self {
        TreeDef::Condition {
            leaf: leaf.to_string(),
            name: None,
            params: BTreeMap::new(),
        }
    }

    pub fn action(leaf: &str) -> Self {
        TreeDef::Action {
            leaf: leaf.to_string(),
            name: None,
            params: BTreeMap::new(),
        }
    }

    /// Renames a node. Leaves are named after their leaf by default.
    pub fn named(mut self, new_name: &str) -> Self {
        match &mut self {
            TreeDef::Sequence { name, .. }
            | TreeDef::ReactiveSequence { name, .. }
            | TreeDef::Selector { name, .. }
            | TreeDef::Condition { name, .. }
            | TreeDef::Action { name, .. } => *name = Some(new_name.to_string()),
        }
        self
    }

    /// Sets a leaf parameter; no effect on composites.
    pub fn with_param(mut self, key: &str, value: f32) -> Self {
        if let TreeDef::Condition { params, .. } | TreeDef::Action { params, .. } = &mut self {
            params.insert(key.to_string(), value);
        }
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolves every leaf against the leaf library.
    pub fn build(&self) -> Result<StealthNode, TemplateError> {
        let node = match self {
            TreeDef::Sequence { name, children } => {
                StealthNode::sequence(label(name, "sequence"), build_all(children)?)
            }
            TreeDef::ReactiveSequence { name, children } => StealthNode::reactive_sequence(
                label(name, "reactive-sequence"),
                build_all(children)?,
            ),
            TreeDef::Selector { name, children } => {
                StealthNode::selector(label(name, "selector"), build_all(children)?)
            }
            TreeDef::Condition { leaf, name, params } => {
                condition(leaf, label(name, leaf), &Params { leaf, values: params })?
            }
            TreeDef::Action { leaf, name, params } => {
                action(leaf, label(name, leaf), &Params { leaf, values: params })?
            }
        };
        Ok(node)
    }

    pub fn compile(&self, name: &str) -> Result<Arc<StealthTemplate>, TemplateError> {
        Ok(BtTemplate::shared(name, self.build()?)?)
    }
}

fn label(name: &Option<String>, fallback: &str) -> Cow<'static, str> {
    Cow::Owned(name.clone().unwrap_or_else(|| fallback.to_string()))
}

fn build_all(children: &[TreeDef]) -> Result<Vec<StealthNode>, TemplateError> {
    children.iter().map(TreeDef::build).collect()
}

struct Params<'a> {
    leaf: &'a str,
    values: &'a BTreeMap<String, f32>,
}

impl Params<'_> {
    fn only(&self, allowed: &[&str]) -> Result<(), TemplateError> {
        match self.values.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(param) => Err(TemplateError::UnknownParam {
                leaf: self.leaf.to_string(),
                param: param.clone(),
            }),
            None => Ok(()),
        }
    }

    fn invalid(&self, param: &str, reason: &str) -> TemplateError {
        TemplateError::InvalidParam {
            leaf: self.leaf.to_string(),
            param: param.to_string(),
            reason: reason.to_string(),
        }
    }

    fn distance(&self, key: &str) -> Result<Option<f32>, TemplateError> {
        match self.values.get(key).copied() {
            Some(v) if !(v.is_finite() && v >= 0.0) => {
                Err(self.invalid(key, "must be a finite, non-negative number"))
            }
            value => Ok(value),
        }
    }

    fn unit(&self, key: &str) -> Result<Option<f32>, TemplateError> {
        match self.values.get(key).copied() {
            Some(v) if !(0.0..=1.0).contains(&v) => Err(self.invalid(key, "must be within [0, 1]")),
            value => Ok(value),
        }
    }

    fn ticks(&self, key: &str) -> Result<Option<u32>, TemplateError> {
        match self.values.get(key).copied() {
            None => Ok(None),
            Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f32 => {
                Ok(Some(v as u32))
            }
            Some(_) => Err(self.invalid(key, "must be a whole number of ticks")),
        }
    }
}

fn condition(
    leaf: &str,
    name: Cow<'static, str>,
    p: &Params<'_>,
) -> Result<StealthNode, TemplateError> {
    let node = match leaf {
        "is-aware" => p.only(&[]).map(|()| leaves::is_aware(name))?,
        "is-alerted" => p.only(&[]).map(|()| leaves::is_alerted(name))?,
        "alert-complete" => p.only(&[]).map(|()| leaves::alert_complete(name))?,
        "sees-wall" => p.only(&[]).map(|()| leaves::sees_wall(name))?,
        "in-follow-range" => p.only(&[]).map(|()| leaves::in_follow_range(name))?,
        "in-harvest-zone" => p.only(&[]).map(|()| leaves::in_harvest_zone(name))?,
        "is-grounded" => p.only(&[]).map(|()| leaves::is_grounded(name))?,
        "attack-ready" => p.only(&[]).map(|()| leaves::attack_ready(name))?,
        "can-see-target" => p.only(&[]).map(|()| leaves::can_see_target(name))?,
        "target-within" => {
            p.only(&["range"])?;
            leaves::target_within(name, p.distance("range")?)
        }
        "point-of-interest-near" => {
            p.only(&["radius"])?;
            leaves::point_of_interest_near(name, p.distance("radius")?)
        }
        "ally-stunned-near" => {
            p.only(&["radius"])?;
            leaves::ally_stunned_near(name, p.distance("radius")?)
        }
        "chance" => {
            p.only(&["p"])?;
            leaves::chance(name, p.unit("p")?)
        }
        other => return Err(TemplateError::UnknownCondition(other.to_string())),
    };
    Ok(node)
}

fn action(
    leaf: &str,
    name: Cow<'static, str>,
    p: &Params<'_>,
) -> Result<StealthNode, TemplateError> {
    let node = match leaf {
        "patrol" => {
            p.only(&["speed", "ticks"])?;
            StealthNode::action(
                name,
                leaves::Patrol {
                    speed: p.unit("speed")?,
                    ticks: p.ticks("ticks")?,
                },
            )
        }
        "hold" => {
            p.only(&["ticks"])?;
            StealthNode::action(
                name,
                leaves::Hold {
                    ticks: p.ticks("ticks")?.unwrap_or(0),
                },
            )
        }
        "stare" => {
            p.only(&["ticks", "radius"])?;
            StealthNode::action(
                name,
                leaves::Stare {
                    ticks: p.ticks("ticks")?,
                    radius: p.distance("radius")?,
                },
            )
        }
        "alert" => p.only(&[]).map(|()| StealthNode::action(name, leaves::AlertHold))?,
        "pursue" => p.only(&[]).map(|()| StealthNode::action(name, leaves::Pursue))?,
        "flee" => p.only(&[]).map(|()| StealthNode::action(name, leaves::Flee))?,
        "track" => p.only(&[]).map(|()| StealthNode::action(name, leaves::Track))?,
        "sweep" => p.only(&[]).map(|()| StealthNode::action(name, leaves::Sweep))?,
        "strike" | "fire" => p.only(&[]).map(|()| StealthNode::action(name, leaves::Attack))?,
        other => return Err(TemplateError::UnknownAction(other.to_string())),
    };
    Ok(node)
}

/// The tree each species ships with.
pub fn builtin_tree(species: Species) -> TreeDef {
    use TreeDef as T;

    let alerting = T::sequence(
        "alerting",
        vec![T::condition("is-alerted"), T::action("alert")],
    );
    match species {
        Species::PatrolChaseAttack => T::selector(
            "chase",
            vec![
                T::reactive_sequence(
                    "engage",
                    vec![
                        T::condition("alert-complete"),
                        T::selector(
                            "attack-or-pursue",
                            vec![
                                T::sequence(
                                    "melee",
                                    vec![
                                        T::condition("target-within"),
                                        T::condition("attack-ready"),
                                        T::action("strike"),
                                    ],
                                ),
                                T::action("pursue"),
                            ],
                        ),
                    ],
                ),
                alerting,
                T::action("patrol"),
            ],
        ),
        Species::PatrolFlee => T::selector(
            "flee",
            vec![
                T::reactive_sequence(
                    "escape",
                    vec![T::condition("alert-complete"), T::action("flee")],
                ),
                alerting,
                T::reactive_sequence(
                    "cower",
                    vec![
                        T::condition("ally-stunned-near"),
                        T::action("hold").named("cower-hold"),
                    ],
                ),
                T::sequence(
                    "curious",
                    vec![
                        T::condition("point-of-interest-near"),
                        T::condition("chance"),
                        T::action("stare"),
                    ],
                ),
                T::action("patrol"),
            ],
        ),
        Species::StationarySentinel => T::selector(
            "sentinel",
            vec![
                T::reactive_sequence(
                    "engage",
                    vec![
                        T::condition("alert-complete"),
                        T::selector(
                            "aim",
                            vec![
                                T::sequence(
                                    "fire-when-clear",
                                    vec![
                                        T::action("track"),
                                        T::condition("can-see-target"),
                                        T::condition("attack-ready"),
                                        T::action("fire"),
                                    ],
                                ),
                                T::action("track").named("keep-aiming"),
                            ],
                        ),
                    ],
                ),
                alerting,
                T::action("sweep"),
            ],
        ),
    }
}

/// Compiled species trees plus the reasons some species have none.
///
/// A species whose tree failed to load keeps its failure until a later load succeeds; agents of
/// that species cannot be registered meanwhile.
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    templates: BTreeMap<Species, Arc<StealthTemplate>>,
    failures: BTreeMap<Species, String>,
}

impl TemplateLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every species with its built-in tree.
    pub fn builtin() -> Self {
        let mut library = Self::empty();
        for species in Species::ALL {
            // Failures are recorded in the library.
            let _ = library.load(species, &builtin_tree(species));
        }
        library
    }

    /// Compiles `def` for `species`, replacing any previous tree.
    ///
    /// On failure the species loses its previous tree and the reason is kept.
    pub fn load(&mut self, species: Species, def: &TreeDef) -> Result<(), TemplateError> {
        match def.compile(species.as_str()) {
            Ok(template) => {
                tracing::debug!(%species, nodes = template.len(), "species tree loaded");
                self.failures.remove(&species);
                self.templates.insert(species, template);
                Ok(())
            }
            Err(err) => {
                self.reject(species, &err);
                Err(err)
            }
        }
    }

    pub fn load_json(&mut self, species: Species, json: &str) -> Result<(), TemplateError> {
        match TreeDef::from_json_str(json) {
            Ok(def) => self.load(species, &def),
            Err(err) => {
                self.reject(species, &err);
                Err(err)
            }
        }
    }

    /// Loads a JSON object mapping species names to trees. Every entry is attempted; the first
    /// error is returned.
    pub fn load_all_json(&mut self, json: &str) -> Result<(), TemplateError> {
        let defs: BTreeMap<Species, TreeDef> = serde_json::from_str(json)?;
        let mut first = None;
        for (species, def) in &defs {
            if let Err(err) = self.load(*species, def) {
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    fn reject(&mut self, species: Species, err: &TemplateError) {
        tracing::error!(%species, error = %err, "species tree failed to load");
        self.templates.remove(&species);
        self.failures.insert(species, err.to_string());
    }

    pub fn get(&self, species: Species) -> Option<&Arc<StealthTemplate>> {
        self.templates.get(&species)
    }

    /// Why `species` has no tree, if it failed to load.
    pub fn failure(&self, species: Species) -> Option<&str> {
        self.failures.get(&species).map(String::as_str)
    }

    pub fn species(&self) -> impl Iterator<Item = Species> + '_ {
        self.templates.keys().copied()
    }
}
