// SPDX-License-Identifier: MIT OR Apache-2.0

//! Numeric identifiers of governed objects, people, roles, attribute definitions, revisions and
//! proposals.
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::serde::deserialize_lenient_u64;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Ok(Self(value.trim().parse()?))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserialize_lenient_u64(deserializer).map(Self)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a governed object within its object type.
    ObjectId
);

numeric_id!(
    /// Identifier of a person in the directory.
    PersonId
);

numeric_id!(
    /// Identifier of an access control role.
    RoleId
);

numeric_id!(
    /// Identifier of a custom attribute definition.
    AttributeId
);

numeric_id!(
    /// Identifier of a revision snapshot. Breaks ties between snapshots created at the same time.
    RevisionId
);

numeric_id!(ProposalId);

/// Identity of a governed object: its type name ("Control", "Program", ...) and id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: ObjectId,
}

impl ObjectKey {
    pub fn new(object_type: &str, id: u64) -> Self {
        Self {
            object_type: object_type.to_string(),
            id: ObjectId::new(id),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.object_type, self.id)
    }
}
