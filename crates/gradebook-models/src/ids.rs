//! Strongly-typed ID newtypes for grade entities.
//!
//! Every row in the grade store is keyed by a positive `BIGINT`. The newtypes
//! keep a `StudentId` from being passed where a `SubjectId` is expected.
//!
//! # Example
//!
//! ```ignore
//! use gradebook_models::ids::{StudentId, SubjectId};
//!
//! let student = StudentId::from_raw(12);
//! assert!(student.is_valid());
//! assert!(!SubjectId::from_raw(0).is_valid());
//! ```

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use utoipa::ToSchema;

use crate::errors::ValidationError;

macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
        #[schema(value_type = i64)]
        pub struct $name(pub i64);

        impl $name {
            #[inline]
            pub const fn from_raw(value: i64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Store ids start at 1; zero and negatives never name a row.
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }

            /// Returns the id, or the "Valid ... ID is required" error.
            pub fn validated(self) -> Result<Self, ValidationError> {
                if self.is_valid() {
                    Ok(self)
                } else {
                    Err(ValidationError::InvalidId { entity: $label })
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            #[inline]
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl Type<sqlx::Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <i64 as Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <i64 as Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <i64 as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <i64 as Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        impl PgHasArrayType for $name {
            fn array_type_info() -> PgTypeInfo {
                <i64 as PgHasArrayType>::array_type_info()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                i64::deserialize(deserializer).map(Self)
            }
        }
    };
}

define_id!(
    /// Strongly-typed ID for students.
    StudentId, "student"
);

define_id!(
    /// Strongly-typed ID for subjects.
    SubjectId, "subject"
);

define_id!(
    /// Strongly-typed ID for classes.
    ClassId, "class"
);

define_id!(
    /// Strongly-typed ID for teachers (the recorder of a grade).
    TeacherId, "teacher"
);

define_id!(
    /// Strongly-typed ID for stored grade records.
    GradeId, "grade"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_rejects_non_positive() {
        assert!(StudentId::from_raw(1).validated().is_ok());

        let err = SubjectId::from_raw(0).validated().unwrap_err();
        assert_eq!(err.to_string(), "Valid subject ID is required");

        let err = TeacherId::from_raw(-4).validated().unwrap_err();
        assert_eq!(err.to_string(), "Valid teacher ID is required");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id: ClassId = serde_json::from_str("17").unwrap();
        assert_eq!(id, ClassId(17));
        assert_eq!(serde_json::to_string(&id).unwrap(), "17");
    }

    #[test]
    fn test_schema_is_a_plain_integer() {
        let schema = serde_json::to_value(<SubjectId as utoipa::PartialSchema>::schema()).unwrap();
        assert_eq!(schema["type"], "integer");
        assert_eq!(schema["format"], "int64");
    }

    #[test]
    fn test_from_str_trims() {
        let id: StudentId = " 42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert!("abc".parse::<StudentId>().is_err());
    }

    #[test]
    fn test_debug_names_the_entity() {
        assert_eq!(format!("{:?}", GradeId(3)), "GradeId(3)");
    }
}
