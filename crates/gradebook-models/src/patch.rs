//! Partial-update values that distinguish "leave unchanged" from "clear".
//!
//! In a JSON body a missing field deserializes to [`Patch::Unchanged`], an
//! explicit `null` to [`Patch::Clear`] and a number to [`Patch::Set`]. Fields
//! of this type must carry `#[serde(default)]` for the missing case to work.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::component::{Component, check_score};
use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    /// Applies the patch over the current value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Unchanged => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Clear, Patch::Set)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Set(value) => serializer.serialize_some(value),
            Patch::Unchanged | Patch::Clear => serializer.serialize_none(),
        }
    }
}

/// A partial update of the three components of a grade record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComponentPatch {
    pub cc: Patch<f64>,
    pub tp: Patch<f64>,
    pub dv: Patch<f64>,
}

impl ComponentPatch {
    pub fn new(cc: Patch<f64>, tp: Patch<f64>, dv: Patch<f64>) -> Self {
        Self { cc, tp, dv }
    }

    /// True when no component is touched.
    pub fn is_empty(&self) -> bool {
        self.cc.is_unchanged() && self.tp.is_unchanged() && self.dv.is_unchanged()
    }

    /// Range-checks every component being set. Clearing is always valid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (component, patch) in self.entries() {
            if let Patch::Set(value) = patch {
                check_score(component, value)?;
            }
        }
        Ok(())
    }

    fn entries(&self) -> [(Component, Patch<f64>); 3] {
        [
            (Component::Cc, self.cc),
            (Component::Tp, self.tp),
            (Component::Dv, self.dv),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default)]
        note: Patch<f64>,
    }

    #[test]
    fn test_deserialize_distinguishes_missing_null_and_value() {
        let missing: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.note, Patch::Unchanged);

        let null: Body = serde_json::from_str(r#"{"note":null}"#).unwrap();
        assert_eq!(null.note, Patch::Clear);

        let set: Body = serde_json::from_str(r#"{"note":12.5}"#).unwrap();
        assert_eq!(set.note, Patch::Set(12.5));
    }

    #[test]
    fn test_apply() {
        assert_eq!(Patch::Unchanged.apply(Some(12.0)), Some(12.0));
        assert_eq!(Patch::Clear.apply(Some(12.0)), None);
        assert_eq!(Patch::Set(15.0).apply(Some(12.0)), Some(15.0));
        assert_eq!(Patch::Set(15.0).apply(None), Some(15.0));
    }

    #[test]
    fn test_validate_only_checks_set_values() {
        let patch = ComponentPatch::new(Patch::Clear, Patch::Unchanged, Patch::Set(20.0));
        assert!(patch.validate().is_ok());

        let patch = ComponentPatch::new(Patch::Set(25.0), Patch::Unchanged, Patch::Unchanged);
        assert!(matches!(
            patch.validate(),
            Err(ValidationError::ScoreOutOfRange {
                component: Component::Cc,
                ..
            })
        ));
    }

    #[test]
    fn test_is_empty() {
        assert!(ComponentPatch::default().is_empty());
        assert!(!ComponentPatch::new(Patch::Clear, Patch::Unchanged, Patch::Unchanged).is_empty());
    }
}
