use std::path::PathBuf;

use ai_bt::BtError;
use ai_core::AgentId;
use thiserror::Error;

use crate::economy::FearAction;
use crate::species::Species;

/// Errors while loading or validating a [`crate::StealthConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {species} profile: {field} {reason}")]
    InvalidProfile {
        species: Species,
        field: &'static str,
        reason: String,
    },

    #[error("unknown species: {0}")]
    UnknownSpecies(String),
}

/// Errors while building a species tree from a [`crate::TreeDef`].
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("tree definition is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown condition leaf: {0}")]
    UnknownCondition(String),

    #[error("unknown action leaf: {0}")]
    UnknownAction(String),

    #[error("leaf {leaf} does not take parameter {param}")]
    UnknownParam { leaf: String, param: String },

    #[error("leaf {leaf}: parameter {param} {reason}")]
    InvalidParam {
        leaf: String,
        param: String,
        reason: String,
    },

    #[error(transparent)]
    Tree(#[from] BtError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("no usable tree for species {species}: {reason}")]
    TemplateUnavailable { species: Species, reason: String },

    #[error("{0} is already registered")]
    AlreadyRegistered(AgentId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EconomyError {
    #[error("{0} is not registered")]
    UnknownAgent(AgentId),

    #[error("not enough fear to {action}: costs {cost}, {available} available")]
    Depleted {
        action: FearAction,
        cost: u32,
        available: u32,
    },

    #[error("{0} cannot be harvested: it must be stunned and inside the harvest zone")]
    NotHarvestable(AgentId),
}
