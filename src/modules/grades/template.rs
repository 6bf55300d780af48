use std::collections::HashMap;

use anyhow::anyhow;
use chrono::Utc;
use tracing::instrument;

use gradebook_core::AppError;
use gradebook_models::import::columns;
use gradebook_models::ids::StudentId;
use gradebook_models::{GradeRecord, Template, TemplateRequest, TemplateStudentRow};

use super::service::{GradeService, validation_error};
use super::store::GradeStore;
use crate::modules::spreadsheet::SpreadsheetReader;

impl<S, R> GradeService<S, R>
where
    S: GradeStore,
    R: SpreadsheetReader,
{
    /// Headers, sample rows and one row per roster student for an import file.
    #[instrument(skip(self))]
    pub async fn generate_template(&self, request: TemplateRequest) -> Result<Template, AppError> {
        let subject_id = request.subject_id.validated().map_err(validation_error)?;
        let class_id = request.class_id.validated().map_err(validation_error)?;

        let subject = self.require_subject(subject_id).await?;
        let class = self.require_class(class_id).await?;
        let config = self
            .store
            .find_config_by_subject(subject_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(anyhow!("Note configuration not found for this subject"))
            })?;
        let students = self.store.find_students_by_class(class_id).await?;

        let has_tp = config.has_tp();
        let with_emails = request.include_student_emails;

        let existing: HashMap<StudentId, GradeRecord> = if request.include_existing_notes {
            self.store
                .find_by_subject_and_class(subject_id, class_id)
                .await?
                .into_iter()
                .map(|r| (r.student_id(), r))
                .collect()
        } else {
            HashMap::new()
        };

        let students = students
            .iter()
            .map(|student| {
                let scores = existing.get(&student.id).map(GradeRecord::scores);
                TemplateStudentRow {
                    first_name: student.first_name.clone(),
                    last_name: student.last_name.clone(),
                    email: student.email.clone().filter(|_| with_emails),
                    student_number: student.student_number.clone(),
                    note_cc: scores.and_then(|s| s.cc),
                    note_tp: scores.and_then(|s| s.tp).filter(|_| has_tp),
                    note_dv: scores.and_then(|s| s.dv),
                }
            })
            .collect();

        Ok(Template {
            filename: template_filename(&subject.name, &class.name),
            headers: headers(has_tp, with_emails),
            sample_data: sample_rows(has_tp, with_emails),
            students,
            has_tp_component: has_tp,
            include_student_emails: with_emails,
            subject_name: subject.name,
            class_name: class.name,
        })
    }
}

fn headers(has_tp: bool, with_emails: bool) -> Vec<String> {
    let mut headers = vec![columns::FIRST_NAME, columns::LAST_NAME, columns::STUDENT_NUMBER];
    if with_emails {
        headers.push(columns::EMAIL);
    }
    headers.push(columns::NOTE_CC);
    if has_tp {
        headers.push(columns::NOTE_TP);
    }
    headers.push(columns::NOTE_DV);

    headers.into_iter().map(String::from).collect()
}

fn sample_rows(has_tp: bool, with_emails: bool) -> Vec<Vec<String>> {
    let samples = [
        ("Ahmed", "Ben Ali", "2021001234", "ahmed.benali@esprit.tn", "15.5", "14.0", "16.0"),
        ("Fatima", "Zahra", "2022005678", "fatima.zahra@esprit.tn", "17.0", "15.5", "18.0"),
    ];

    samples
        .iter()
        .map(|&(first, last, number, email, cc, tp, dv)| {
            let mut row = vec![first, last, number];
            if with_emails {
                row.push(email);
            }
            row.push(cc);
            if has_tp {
                row.push(tp);
            }
            row.push(dv);
            row.into_iter().map(String::from).collect()
        })
        .collect()
}

/// `notes_import_<subject>_<class>_<YYYY-MM-DD>.xlsx`, with characters that
/// are unsafe in a `Content-Disposition` header replaced by `_`.
fn template_filename(subject_name: &str, class_name: &str) -> String {
    let safe = |name: &str| -> String {
        name.chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    };

    format!(
        "notes_import_{}_{}_{}.xlsx",
        safe(subject_name),
        safe(class_name),
        Utc::now().format("%Y-%m-%d")
    )
}

/// Renders a template as CSV: the headers, then the roster rows, or the
/// sample rows when the class has no students.
pub fn render_csv(template: &Template) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&template.headers)?;

    let rows = if template.students.is_empty() {
        template.sample_data.clone()
    } else {
        template.student_cells()
    };
    for row in &rows {
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_follow_config_and_email_flag() {
        assert_eq!(
            headers(false, false),
            vec!["prenom", "nom", "numeroetudiant", "noteCC", "noteDV"]
        );
        assert_eq!(
            headers(true, true),
            vec!["prenom", "nom", "numeroetudiant", "email", "noteCC", "noteTP", "noteDV"]
        );
    }

    #[test]
    fn test_sample_rows_match_header_width() {
        for (tp, email) in [(false, false), (true, false), (false, true), (true, true)] {
            let width = headers(tp, email).len();
            assert!(sample_rows(tp, email).iter().all(|r| r.len() == width));
        }
        assert_eq!(sample_rows(false, false)[0][0], "Ahmed");
        assert_eq!(sample_rows(true, false)[1][4], "15.5");
    }

    #[test]
    fn test_filename_is_sanitised_and_dated() {
        let name = template_filename("Math Analyse", "GL/2");
        let today = Utc::now().format("%Y-%m-%d").to_string();

        assert_eq!(name, format!("notes_import_Math_Analyse_GL_2_{today}.xlsx"));
    }

    #[test]
    fn test_render_csv_falls_back_to_samples() {
        let template = Template {
            filename: "t.xlsx".to_string(),
            headers: headers(false, false),
            sample_data: sample_rows(false, false),
            students: Vec::new(),
            has_tp_component: false,
            include_student_emails: false,
            subject_name: "Math".to_string(),
            class_name: "GL1".to_string(),
        };

        let csv = String::from_utf8(render_csv(&template).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("prenom,nom,numeroetudiant,noteCC,noteDV"));
        assert_eq!(lines.next(), Some("Ahmed,Ben Ali,2021001234,15.5,16.0"));
    }

    #[test]
    fn test_render_csv_prefers_roster_rows() {
        let template = Template {
            filename: "t.xlsx".to_string(),
            headers: headers(false, false),
            sample_data: sample_rows(false, false),
            students: vec![TemplateStudentRow {
                first_name: "Amina".to_string(),
                last_name: "Trabelsi".to_string(),
                email: None,
                student_number: "2024001".to_string(),
                note_cc: Some(12.5),
                note_tp: None,
                note_dv: None,
            }],
            has_tp_component: false,
            include_student_emails: false,
            subject_name: "Math".to_string(),
            class_name: "GL1".to_string(),
        };

        let csv = String::from_utf8(render_csv(&template).unwrap()).unwrap();
        assert_eq!(csv.lines().nth(1), Some("Amina,Trabelsi,2024001,12.5,"));
        assert_eq!(csv.lines().count(), 2);
    }
}
