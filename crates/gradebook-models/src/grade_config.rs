//! Per-subject weighting policy combining CC, TP and DV into a final grade.

use crate::component::{Component, DominantComponent, round2};
use crate::errors::ValidationError;
use crate::ids::SubjectId;

const WEIGHT_TOLERANCE: f64 = 0.01;
const DOMINANCE_THRESHOLD: f64 = 40.0;

/// Immutable grade weighting for one subject.
///
/// Percentages always sum to 100 (within 0.01). A subject weights TP only
/// when `pct_tp > 0`; in that case TP becomes a required component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeConfig {
    subject_id: SubjectId,
    pct_cc: f64,
    pct_tp: f64,
    pct_dv: f64,
}

impl GradeConfig {
    pub fn create(
        subject_id: SubjectId,
        pct_cc: f64,
        pct_tp: f64,
        pct_dv: f64,
    ) -> Result<Self, ValidationError> {
        for (component, value) in [
            (Component::Cc, pct_cc),
            (Component::Tp, pct_tp),
            (Component::Dv, pct_dv),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ValidationError::PercentageOutOfRange { component, value });
            }
        }

        let total = pct_cc + pct_tp + pct_dv;
        if (total - 100.0).abs() > WEIGHT_TOLERANCE {
            return Err(ValidationError::WeightSum { total });
        }

        Ok(Self {
            subject_id,
            pct_cc,
            pct_tp,
            pct_dv,
        })
    }

    /// CC 40% and DV 60%, no practical work.
    pub fn standard(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            pct_cc: 40.0,
            pct_tp: 0.0,
            pct_dv: 60.0,
        }
    }

    /// CC 30%, TP 30% and DV 40%.
    pub fn with_tp(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            pct_cc: 30.0,
            pct_tp: 30.0,
            pct_dv: 40.0,
        }
    }

    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    pub fn pct_cc(&self) -> f64 {
        self.pct_cc
    }

    pub fn pct_tp(&self) -> f64 {
        self.pct_tp
    }

    pub fn pct_dv(&self) -> f64 {
        self.pct_dv
    }

    pub fn has_tp(&self) -> bool {
        self.pct_tp > 0.0
    }

    pub fn dominant_component(&self) -> DominantComponent {
        let (component, pct) = [
            (Component::Cc, self.pct_cc),
            (Component::Tp, self.pct_tp),
            (Component::Dv, self.pct_dv),
        ]
        .into_iter()
        .fold((Component::Cc, f64::MIN), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        });

        if pct > DOMINANCE_THRESHOLD {
            component.into()
        } else {
            DominantComponent::Balanced
        }
    }

    /// Weighted final grade rounded to two decimals.
    ///
    /// Returns `None` when a required component is missing. CC and DV are
    /// always required; TP only when the subject weights it. A TP score given
    /// for a subject without TP is ignored.
    pub fn final_grade(&self, cc: Option<f64>, tp: Option<f64>, dv: Option<f64>) -> Option<f64> {
        let cc = cc?;
        let dv = dv?;

        let mut total = cc * self.pct_cc / 100.0 + dv * self.pct_dv / 100.0;
        if self.has_tp() {
            total += tp? * self.pct_tp / 100.0;
        }

        Some(round2(total))
    }
}
