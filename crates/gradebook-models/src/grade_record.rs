//! A student's component scores and final grade for one subject.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::component::{Component, MAX_SCORE, MIN_SCORE, PASS_MARK, check_score};
use crate::errors::ValidationError;
use crate::grade_config::GradeConfig;
use crate::ids::{GradeId, StudentId, SubjectId, TeacherId};
use crate::patch::ComponentPatch;

/// The three optional component scores of a record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ComponentScores {
    pub cc: Option<f64>,
    pub tp: Option<f64>,
    pub dv: Option<f64>,
}

impl ComponentScores {
    pub fn new(cc: Option<f64>, tp: Option<f64>, dv: Option<f64>) -> Self {
        Self { cc, tp, dv }
    }

    pub fn get(&self, component: Component) -> Option<f64> {
        match component {
            Component::Cc => self.cc,
            Component::Tp => self.tp,
            Component::Dv => self.dv,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cc.is_none() && self.tp.is_none() && self.dv.is_none()
    }

    fn validate(self) -> Result<Self, ValidationError> {
        for component in Component::ALL {
            if let Some(value) = self.get(component) {
                check_score(component, value)?;
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum GradeLetter {
    A,
    B,
    C,
    D,
    F,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl GradeLetter {
    pub fn from_final(final_grade: Option<f64>) -> Self {
        match final_grade {
            None => GradeLetter::NotAvailable,
            Some(g) if g >= 16.0 => GradeLetter::A,
            Some(g) if g >= 14.0 => GradeLetter::B,
            Some(g) if g >= 12.0 => GradeLetter::C,
            Some(g) if g >= 10.0 => GradeLetter::D,
            Some(_) => GradeLetter::F,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GradeLetter::A => "A",
            GradeLetter::B => "B",
            GradeLetter::C => "C",
            GradeLetter::D => "D",
            GradeLetter::F => "F",
            GradeLetter::NotAvailable => "N/A",
        }
    }
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grade record for one (student, subject) pair.
///
/// Records are values: updates return a new record and never mutate in
/// place. `note_finale` is derived from the subject's [`GradeConfig`] by
/// [`GradeRecord::with_final_grade`] and is `None` until every required
/// component is present.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRecord {
    id: Option<GradeId>,
    student_id: StudentId,
    subject_id: SubjectId,
    teacher_id: TeacherId,
    scores: ComponentScores,
    note_finale: Option<f64>,
}

impl GradeRecord {
    /// Creates an unsaved record. Fails if a present score is outside [0, 20].
    pub fn create(
        student_id: StudentId,
        subject_id: SubjectId,
        teacher_id: TeacherId,
        scores: ComponentScores,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: None,
            student_id,
            subject_id,
            teacher_id,
            scores: scores.validate()?,
            note_finale: None,
        })
    }

    /// Rebuilds a stored record, re-checking every score.
    pub fn restore(
        id: GradeId,
        student_id: StudentId,
        subject_id: SubjectId,
        teacher_id: TeacherId,
        scores: ComponentScores,
        note_finale: Option<f64>,
    ) -> Result<Self, ValidationError> {
        if let Some(value) = note_finale.filter(|v| !(MIN_SCORE..=MAX_SCORE).contains(v)) {
            return Err(ValidationError::FinalGradeOutOfRange { value });
        }

        Ok(Self {
            id: Some(id),
            student_id,
            subject_id,
            teacher_id,
            scores: scores.validate()?,
            note_finale,
        })
    }

    /// Returns a copy with the patch applied over the current scores.
    ///
    /// Unchanged fields keep their value, cleared fields become `None`. The
    /// final grade is reset; call [`GradeRecord::with_final_grade`] afterwards.
    pub fn with_updated_components(&self, patch: &ComponentPatch) -> Result<Self, ValidationError> {
        let scores = ComponentScores {
            cc: patch.cc.apply(self.scores.cc),
            tp: patch.tp.apply(self.scores.tp),
            dv: patch.dv.apply(self.scores.dv),
        }
        .validate()?;

        Ok(Self {
            scores,
            note_finale: None,
            ..self.clone()
        })
    }

    /// Returns a copy whose final grade is computed with `config`, or cleared
    /// when the subject has no configuration.
    pub fn with_final_grade(&self, config: Option<&GradeConfig>) -> Self {
        let note_finale =
            config.and_then(|c| c.final_grade(self.scores.cc, self.scores.tp, self.scores.dv));

        Self {
            note_finale,
            ..self.clone()
        }
    }

    pub fn with_id(self, id: GradeId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    pub fn id(&self) -> Option<GradeId> {
        self.id
    }

    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    pub fn teacher_id(&self) -> TeacherId {
        self.teacher_id
    }

    pub fn scores(&self) -> ComponentScores {
        self.scores
    }

    pub fn note_cc(&self) -> Option<f64> {
        self.scores.cc
    }

    pub fn note_tp(&self) -> Option<f64> {
        self.scores.tp
    }

    pub fn note_dv(&self) -> Option<f64> {
        self.scores.dv
    }

    pub fn note_finale(&self) -> Option<f64> {
        self.note_finale
    }

    pub fn is_passed(&self) -> bool {
        self.note_finale.is_some_and(|g| g >= PASS_MARK)
    }

    pub fn grade_letter(&self) -> GradeLetter {
        GradeLetter::from_final(self.note_finale)
    }

    /// CC and DV are always required, TP only when `has_tp`.
    pub fn has_all_required(&self, has_tp: bool) -> bool {
        self.scores.cc.is_some() && self.scores.dv.is_some() && (!has_tp || self.scores.tp.is_some())
    }

    /// Share of required components present, as a rounded integer percentage.
    pub fn completion_percentage(&self, has_tp: bool) -> u8 {
        let total = if has_tp { 3 } else { 2 };
        let completed = [
            self.scores.cc.is_some(),
            self.scores.dv.is_some(),
            has_tp && self.scores.tp.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();

        ((completed as f64 / total as f64) * 100.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;

    fn record(cc: Option<f64>, tp: Option<f64>, dv: Option<f64>) -> GradeRecord {
        GradeRecord::create(
            StudentId(1),
            SubjectId(2),
            TeacherId(3),
            ComponentScores::new(cc, tp, dv),
        )
        .unwrap()
    }

    #[test]
    fn test_create_rejects_out_of_range() {
        let err = GradeRecord::create(
            StudentId(1),
            SubjectId(2),
            TeacherId(3),
            ComponentScores::new(None, Some(-1.0), None),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "TP note must be between 0 and 20");
    }

    #[test]
    fn test_full_standard_record() {
        let config = GradeConfig::create(SubjectId(2), 40.0, 0.0, 60.0).unwrap();
        let graded = record(Some(14.0), None, Some(16.0)).with_final_grade(Some(&config));

        assert_eq!(graded.note_finale(), Some(15.2));
        assert!(graded.is_passed());
        assert_eq!(graded.grade_letter(), GradeLetter::B);
        assert_eq!(graded.completion_percentage(false), 100);
    }

    #[test]
    fn test_missing_dv_is_incomplete() {
        let config = GradeConfig::standard(SubjectId(2));
        let graded = record(Some(14.0), None, None).with_final_grade(Some(&config));

        assert_eq!(graded.note_finale(), None);
        assert!(!graded.is_passed());
        assert_eq!(graded.grade_letter().as_str(), "N/A");
        assert_eq!(graded.completion_percentage(false), 50);
    }

    #[test]
    fn test_update_keeps_unspecified_components() {
        let original = record(Some(12.0), None, None);
        let patch = ComponentPatch::new(Patch::Unchanged, Patch::Unchanged, Patch::Set(15.0));

        let updated = original.with_updated_components(&patch).unwrap();
        assert_eq!(updated.note_cc(), Some(12.0));
        assert_eq!(updated.note_dv(), Some(15.0));
        // original untouched
        assert_eq!(original.note_dv(), None);
    }

    #[test]
    fn test_update_clear_and_invalid() {
        let original = record(Some(12.0), Some(9.0), Some(11.0));

        let cleared = original
            .with_updated_components(&ComponentPatch::new(
                Patch::Clear,
                Patch::Unchanged,
                Patch::Unchanged,
            ))
            .unwrap();
        assert_eq!(cleared.note_cc(), None);
        assert_eq!(cleared.note_tp(), Some(9.0));

        let invalid = ComponentPatch::new(Patch::Set(20.5), Patch::Unchanged, Patch::Unchanged);
        assert!(original.with_updated_components(&invalid).is_err());
    }

    #[test]
    fn test_completion_with_tp() {
        let partial = record(Some(12.0), None, Some(11.0));
        assert_eq!(partial.completion_percentage(true), 67);
        assert!(!partial.has_all_required(true));
        assert!(partial.has_all_required(false));
    }

    #[test]
    fn test_grade_letter_thresholds() {
        assert_eq!(GradeLetter::from_final(Some(16.0)), GradeLetter::A);
        assert_eq!(GradeLetter::from_final(Some(15.99)), GradeLetter::B);
        assert_eq!(GradeLetter::from_final(Some(12.0)), GradeLetter::C);
        assert_eq!(GradeLetter::from_final(Some(10.0)), GradeLetter::D);
        assert_eq!(GradeLetter::from_final(Some(9.99)), GradeLetter::F);
        assert_eq!(serde_json::to_string(&GradeLetter::NotAvailable).unwrap(), r#""N/A""#);
    }

    #[test]
    fn test_no_config_clears_final_grade() {
        let graded = record(Some(14.0), None, Some(16.0)).with_final_grade(None);
        assert_eq!(graded.note_finale(), None);
    }
}
