//! Identifier newtypes and entity references.
//!
//! Users and models are named locally: the backend never originates their
//! identifiers. A generated id is reused for every later call on the entity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

id_newtype!(
    /// Identifier of a user on the proxy.
    UserId
);
id_newtype!(
    /// Identifier of a team on the proxy.
    TeamId
);
id_newtype!(
    /// Identifier of a model deployment (`model_info.id`).
    ModelId
);
id_newtype!(
    /// Key token. The backend returns both the raw `sk-` secret and its
    /// hashed token; either is accepted for lookups and deletes.
    KeyToken
);

impl UserId {
    /// Fresh random identifier for a user the caller did not name.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl TeamId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ModelId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// Entity kinds and references
// ---------------------------------------------------------------------------

/// The kinds of record the admin API holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Team,
    Key,
    Model,
}

impl EntityKind {
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::User,
            EntityKind::Team,
            EntityKind::Key,
            EntityKind::Model,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Team => write!(f, "team"),
            EntityKind::Key => write!(f, "key"),
            EntityKind::Model => write!(f, "model"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(EntityKind::User),
            "team" => Ok(EntityKind::Team),
            "key" => Ok(EntityKind::Key),
            "model" => Ok(EntityKind::Model),
            other => Err(format!(
                "unknown entity kind '{other}'; expected: user, team, key, model"
            )),
        }
    }
}

/// An identifier together with the kind of entity it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn user(id: &UserId) -> Self {
        Self::new(EntityKind::User, id.0.clone())
    }

    pub fn team(id: &TeamId) -> Self {
        Self::new(EntityKind::Team, id.0.clone())
    }

    pub fn key(token: &KeyToken) -> Self {
        Self::new(EntityKind::Key, token.0.clone())
    }

    pub fn model(id: &ModelId) -> Self {
        Self::new(EntityKind::Model, id.0.clone())
    }
}

/// `<kind>/<id>`, the form used as the state-file key.
impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

impl FromStr for EntityRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('/')
            .ok_or_else(|| format!("expected <kind>/<id>, got '{s}'"))?;
        if id.is_empty() {
            return Err(format!("empty id in '{s}'"));
        }
        Ok(Self::new(kind.parse()?, id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(UserId::from("u-1").to_string(), "u-1");
        assert_eq!(TeamId::from("t-1").to_string(), "t-1");
        assert_eq!(KeyToken::from("sk-a").to_string(), "sk-a");
    }

    #[test]
    fn generated_ids_are_distinct_uuids() {
        let a = UserId::generate();
        let b = UserId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
        assert!(Uuid::parse_str(ModelId::generate().as_str()).is_ok());
    }

    #[test]
    fn entity_ref_roundtrips_through_display() {
        let r = EntityRef::model(&ModelId::from("m-42"));
        assert_eq!(r.to_string(), "model/m-42");
        assert_eq!("model/m-42".parse::<EntityRef>().unwrap(), r);
    }

    #[test]
    fn entity_ref_keeps_slashes_in_id() {
        let r: EntityRef = "team/org/eng".parse().unwrap();
        assert_eq!(r.kind, EntityKind::Team);
        assert_eq!(r.id, "org/eng");
    }

    #[test]
    fn entity_ref_rejects_garbage() {
        assert!("user".parse::<EntityRef>().is_err());
        assert!("widget/1".parse::<EntityRef>().is_err());
        assert!("user/".parse::<EntityRef>().is_err());
    }

    #[test]
    fn id_serializes_transparently() {
        let json = serde_json::to_string(&UserId::from("u-1")).unwrap();
        assert_eq!(json, "\"u-1\"");
    }
}
