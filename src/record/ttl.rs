use serde::{Deserialize, Serialize};

/// TTL value for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordTTL {
    #[default]
    Auto,
    Value(u32),
}

impl RecordTTL {
    /// Value sent to the provider, where `1` means automatic.
    pub fn as_provider_value(&self) -> u32 {
        match self {
            RecordTTL::Auto => 1,
            RecordTTL::Value(v) => *v,
        }
    }
}

impl Serialize for RecordTTL {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            RecordTTL::Auto => serializer.serialize_str("auto"),
            RecordTTL::Value(v) => serializer.serialize_u32(*v),
        }
    }
}

impl<'de> Deserialize<'de> for RecordTTL {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct TTLVisitor;

        impl serde::de::Visitor<'_> for TTLVisitor {
            type Value = RecordTTL;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a valid TTL value")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v.eq_ignore_ascii_case("auto") {
                    Ok(RecordTTL::Auto)
                } else {
                    Ok(RecordTTL::Value(v.parse().map_err(E::custom)?))
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u32::try_from(v).map(RecordTTL::Value).map_err(E::custom)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u32::try_from(v).map(RecordTTL::Value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(TTLVisitor)
    }
}
