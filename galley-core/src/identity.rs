//! Identity types for Galley entities

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behaviour for strongly-typed entity identifiers.
///
/// Every id is a UUID underneath; the newtype keeps a recipe id from being
/// handed to an API that expects some other entity's id.
pub trait EntityIdType:
    Copy + Eq + std::hash::Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Lowercase entity name used in error messages.
    const ENTITY_NAME: &'static str;

    /// Wrap a raw UUID.
    fn new(uuid: Uuid) -> Self;

    /// Unwrap to the raw UUID.
    fn as_uuid(&self) -> Uuid;
}

/// Identifier of a recipe. Assigned by the service, never by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
#[serde(transparent)]
pub struct RecipeId(Uuid);

impl EntityIdType for RecipeId {
    const ENTITY_NAME: &'static str = "recipe";

    fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecipeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for RecipeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Source of fresh recipe identifiers.
///
/// Exactly one generator is chosen per deployment and handed to the
/// coordinator; store gateways never mint ids of their own.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> RecipeId;
}

/// Default generator: UUIDv7, so ids sort by creation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn next_id(&self) -> RecipeId {
        RecipeId(Uuid::now_v7())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_id_parse_roundtrip() {
        let id = UuidV7Generator.next_id();
        let parsed: RecipeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_recipe_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<RecipeId>().is_err());
    }

    #[test]
    fn test_recipe_id_serializes_as_plain_string() {
        let id = RecipeId::new(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn test_generator_yields_distinct_ids() {
        let gen = UuidV7Generator;
        let a = gen.next_id();
        let b = gen.next_id();
        assert_ne!(a, b);
    }
}
