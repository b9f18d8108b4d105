//! Prefixed identifiers for agents and tasks
//!
//! `AgentId` and `TaskId` are both UUIDs underneath but distinct types, and
//! their text form carries the kind (`agent_<uuid>`, `task_<uuid>`) so an id
//! pasted into the CLI or a log line is rejected if it names the wrong thing.

use schemars::JsonSchema;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// Marks what an [`Id`] refers to
pub trait IdType: 'static {
    const PREFIX: &'static str;
}

#[derive(Debug)]
pub enum AgentMarker {}

#[derive(Debug)]
pub enum TaskMarker {}

impl IdType for AgentMarker {
    const PREFIX: &'static str = "agent";
}

impl IdType for TaskMarker {
    const PREFIX: &'static str = "task";
}

pub type AgentId = Id<AgentMarker>;
pub type TaskId = Id<TaskMarker>;

pub struct Id<T> {
    uuid: Uuid,
    kind: PhantomData<fn() -> T>,
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum IdParseError {
    #[error("'{input}' is not a {expected} id")]
    #[diagnostic(
        code(swarm_core::id::wrong_kind),
        help("{expected} ids look like '{expected}_<uuid>'")
    )]
    WrongKind { expected: &'static str, input: String },

    #[error("Malformed uuid in id: {0}")]
    #[diagnostic(code(swarm_core::id::uuid))]
    Uuid(#[from] uuid::Error),
}

impl<T: IdType> Id<T> {
    pub fn generate() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind: PhantomData,
        }
    }

    pub fn parse(input: &str) -> Result<Self, IdParseError> {
        let uuid = input
            .strip_prefix(T::PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| IdParseError::WrongKind {
                expected: T::PREFIX,
                input: input.to_string(),
            })?;

        Ok(Self {
            uuid: Uuid::parse_str(uuid)?,
            kind: PhantomData,
        })
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

// Manual impls so the marker type needs no bounds of its own.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl<T: IdType> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", T::PREFIX, self.uuid)
    }
}

impl<T: IdType> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<T: IdType> FromStr for Id<T> {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<T: IdType> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: IdType> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PrefixedId<T>(PhantomData<fn() -> T>);

        impl<T: IdType> Visitor<'_> for PrefixedId<T> {
            type Value = Id<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a '{}_<uuid>' string", T::PREFIX)
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Id<T>, E> {
                Id::parse(s).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(PrefixedId(PhantomData))
    }
}

impl<T: IdType> JsonSchema for Id<T> {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        format!("{}_id", T::PREFIX).into()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        String::json_schema(generator)
    }
}
