use thiserror::Error;

use crate::core::types::EntityId;
use crate::entity::EntityType;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Entity not found: {0:?}")]
    EntityNotFound(EntityId),

    #[error("Entity {id:?} is a {actual:?}, expected {expected:?}")]
    WrongEntityKind {
        id: EntityId,
        expected: EntityType,
        actual: EntityType,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Behavior '{label}' faulted: {reason}")]
    BehaviorFault { label: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl SimError {
    pub fn fault(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BehaviorFault {
            label: label.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
