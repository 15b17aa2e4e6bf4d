// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use serde::de::{Error as SerdeError, Unexpected, Visitor};

/// Helper method for `serde` to deserialize an unsigned integer identifier which might have been
/// encoded as a number or as a numeric string.
///
/// Revision content and client payloads are not consistent here: role ids for example arrive as
/// strings (`"12"`) while person ids are numbers. Both decode into the same value.
pub fn deserialize_lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(LenientU64Visitor)
}

struct LenientU64Visitor;

impl<'de> Visitor<'de> for LenientU64Visitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("unsigned integer or numeric string")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: SerdeError,
    {
        Ok(value)
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: SerdeError,
    {
        u64::try_from(value).map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where
        E: SerdeError,
    {
        if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
            Ok(value as u64)
        } else {
            Err(E::invalid_value(Unexpected::Float(value), &self))
        }
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: SerdeError,
    {
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
    }
}
