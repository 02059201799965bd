use thiserror::Error;

use crate::world::EntityId;

#[derive(Debug, Error)]
pub enum RealmError {
    #[error("map radius {0} is outside the supported range 4..=40")]
    InvalidRadius(i32),
    #[error("unknown difficulty '{0}' (expected easy, normal or hard)")]
    UnknownDifficulty(String),
    #[error("no plains hex near the centre can host a starting settlement")]
    NoStartingSite,
    #[error("no entity with id {0}")]
    UnknownEntity(EntityId),
}
