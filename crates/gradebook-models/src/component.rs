//! The three weighted grade components.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Lowest and highest score a component or final grade can take.
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 20.0;

/// Final grade at or above which a student passes.
pub const PASS_MARK: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Component {
    /// Continuous assessment
    #[serde(rename = "CC")]
    Cc,
    /// Practical / lab work
    #[serde(rename = "TP")]
    Tp,
    /// Final exam
    #[serde(rename = "DV")]
    Dv,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Cc, Component::Tp, Component::Dv];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Cc => "CC",
            Component::Tp => "TP",
            Component::Dv => "DV",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The component carrying the largest weight, when it carries more than 40%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DominantComponent {
    #[serde(rename = "CC")]
    Cc,
    #[serde(rename = "TP")]
    Tp,
    #[serde(rename = "DV")]
    Dv,
    #[serde(rename = "balanced")]
    Balanced,
}

impl From<Component> for DominantComponent {
    fn from(component: Component) -> Self {
        match component {
            Component::Cc => DominantComponent::Cc,
            Component::Tp => DominantComponent::Tp,
            Component::Dv => DominantComponent::Dv,
        }
    }
}

/// Rounds to two decimals, the precision grades and averages are reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Checks a single score against the [0, 20] range.
pub fn check_score(component: Component, value: f64) -> Result<f64, crate::ValidationError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&value) {
        Ok(value)
    } else {
        Err(crate::ValidationError::ScoreOutOfRange { component, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_score_bounds() {
        assert!(check_score(Component::Cc, 0.0).is_ok());
        assert!(check_score(Component::Cc, 20.0).is_ok());
        assert!(check_score(Component::Tp, f64::NAN).is_err());

        let err = check_score(Component::Cc, 25.0).unwrap_err();
        assert_eq!(err.to_string(), "CC note must be between 0 and 20");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(15.199999), 15.2);
        assert_eq!(round2(12.346), 12.35);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Component::Dv).unwrap(), r#""DV""#);
        assert_eq!(
            serde_json::to_string(&DominantComponent::Balanced).unwrap(),
            r#""balanced""#
        );
    }
}
