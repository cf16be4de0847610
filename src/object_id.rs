use thiserror::Error;

/// An error related to parsing an object ID
#[derive(Debug, Error)]
pub enum ObjectIdError {
    /// The prefix in the parsed ID did not match the expected prefix
    #[error("Invalid ID prefix, expected {0}")]
    InvalidPrefix(&'static str),

    /// The portion after the prefix was not a valid UUID
    #[error("Failed to decode object ID")]
    DecodeFailure,
}

/// Create a new object ID type. Object IDs are stored in Postgres as plain
/// UUIDs but rendered externally as a prefixed string, e.g. `usr_018e...`,
/// so that an ID is recognizable on its own. UUIDv7 keeps the string form
/// lexicographically sortable by creation time.
#[macro_export]
macro_rules! make_object_id {
    ($typ:ident, $prefix:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $typ(pub uuid::Uuid);

        impl $typ {
            /// Create a new random ID with a timestamp of now
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Create an ID from an existing UUID
            pub const fn from_uuid(u: uuid::Uuid) -> Self {
                Self(u)
            }

            /// Return a reference to the inner UUID
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// The short prefix for this ID type
            pub fn prefix() -> &'static str {
                stringify!($prefix)
            }
        }

        impl Default for $typ {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $typ {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$typ> for uuid::Uuid {
            fn from(id: $typ) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $typ {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", stringify!($prefix), self.0)
            }
        }

        impl std::fmt::Debug for $typ {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($typ))
                    .field(&self.to_string())
                    .finish()
            }
        }

        impl std::str::FromStr for $typ {
            type Err = $crate::object_id::ObjectIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let suffix = s
                    .strip_prefix(stringify!($prefix))
                    .and_then(|rest| rest.strip_prefix('_'))
                    .ok_or($crate::object_id::ObjectIdError::InvalidPrefix(stringify!(
                        $prefix
                    )))?;

                suffix
                    .parse::<uuid::Uuid>()
                    .map(Self)
                    .map_err(|_| $crate::object_id::ObjectIdError::DecodeFailure)
            }
        }

        impl serde::Serialize for $typ {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> serde::Deserialize<'de> for $typ {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(
                    deserializer,
                )?;

                // Accept the bare UUID form as well. This mostly happens when
                // deserializing JSON built inside Postgres itself.
                s.parse::<$typ>()
                    .or_else(|e| s.parse::<uuid::Uuid>().map($typ::from_uuid).map_err(|_| e))
                    .map_err(serde::de::Error::custom)
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $typ {
            fn type_info() -> <sqlx::Postgres as sqlx::Database>::TypeInfo {
                <uuid::Uuid as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl sqlx::postgres::PgHasArrayType for $typ {
            fn array_type_info() -> sqlx::postgres::PgTypeInfo {
                <uuid::Uuid as sqlx::postgres::PgHasArrayType>::array_type_info()
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $typ {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::database::HasArguments<'q>>::ArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <uuid::Uuid as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $typ {
            fn decode(
                value: <sqlx::Postgres as sqlx::database::HasValueRef<'r>>::ValueRef,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                Ok(Self(<uuid::Uuid as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?))
            }
        }
    };
}
