use serde::{Deserialize, Serialize};

use crate::ids::ActorId;

/// Display name used when an actor cannot be resolved.
pub const UNKNOWN_ACTOR_NAME: &str = "Unknown";

/// A party that causes events: producer, retailer, administrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(),
            name: name.into(),
        }
    }
}
