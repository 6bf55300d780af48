use sqlx::{FromRow, PgPool};
use tracing::{Instrument, instrument, warn};

use gradebook_models::ids::{ClassId, GradeId, StudentId, SubjectId, TeacherId};
use gradebook_models::{
    ComponentScores, GradeConfig, GradeRecord, SchoolClass, Student, Subject,
    SubjectClassStatistics, TeacherAssignment, ValidationError,
};

use super::store::{GradeStore, StoreError};
use crate::db_operation_span;

const GRADE_COLUMNS: &str =
    "id, student_id, subject_id, teacher_id, note_cc, note_tp, note_dv, note_finale";

#[derive(Debug, FromRow)]
struct GradeRow {
    id: GradeId,
    student_id: StudentId,
    subject_id: SubjectId,
    teacher_id: TeacherId,
    note_cc: Option<f64>,
    note_tp: Option<f64>,
    note_dv: Option<f64>,
    note_finale: Option<f64>,
}

impl TryFrom<GradeRow> for GradeRecord {
    type Error = ValidationError;

    fn try_from(row: GradeRow) -> Result<Self, Self::Error> {
        GradeRecord::restore(
            row.id,
            row.student_id,
            row.subject_id,
            row.teacher_id,
            ComponentScores::new(row.note_cc, row.note_tp, row.note_dv),
            row.note_finale,
        )
    }
}

#[derive(Debug, FromRow)]
struct ConfigRow {
    subject_id: SubjectId,
    pct_cc: f64,
    pct_tp: f64,
    pct_dv: f64,
}

impl TryFrom<ConfigRow> for GradeConfig {
    type Error = ValidationError;

    fn try_from(row: ConfigRow) -> Result<Self, Self::Error> {
        GradeConfig::create(row.subject_id, row.pct_cc, row.pct_tp, row.pct_dv)
    }
}

/// [`GradeStore`] backed by PostgreSQL.
#[derive(Clone, Debug)]
pub struct PgGradeStore {
    db: PgPool,
}

impl PgGradeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn upsert(&self, record: &GradeRecord) -> Result<GradeRecord, StoreError> {
        let row = sqlx::query_as::<_, GradeRow>(&format!(
            r#"INSERT INTO grades (student_id, subject_id, teacher_id, note_cc, note_tp, note_dv, note_finale)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (student_id, subject_id) DO UPDATE SET
                   note_cc = EXCLUDED.note_cc,
                   note_tp = EXCLUDED.note_tp,
                   note_dv = EXCLUDED.note_dv,
                   note_finale = EXCLUDED.note_finale,
                   updated_at = NOW()
               RETURNING {GRADE_COLUMNS}"#
        ))
        .bind(record.student_id())
        .bind(record.subject_id())
        .bind(record.teacher_id())
        .bind(record.note_cc())
        .bind(record.note_tp())
        .bind(record.note_dv())
        .bind(record.note_finale())
        .fetch_one(&self.db)
        .await?;

        Ok(row.try_into()?)
    }
}

impl GradeStore for PgGradeStore {
    #[instrument(skip(self))]
    async fn find_by_student_and_subject(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
    ) -> Result<Option<GradeRecord>, StoreError> {
        let row = sqlx::query_as::<_, GradeRow>(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades WHERE student_id = $1 AND subject_id = $2"
        ))
        .bind(student_id)
        .bind(subject_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(GradeRecord::try_from).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_by_subject_and_class(
        &self,
        subject_id: SubjectId,
        class_id: ClassId,
    ) -> Result<Vec<GradeRecord>, StoreError> {
        let rows = sqlx::query_as::<_, GradeRow>(
            r#"SELECT g.id, g.student_id, g.subject_id, g.teacher_id,
                      g.note_cc, g.note_tp, g.note_dv, g.note_finale
               FROM grades g
               INNER JOIN students s ON s.id = g.student_id
               WHERE g.subject_id = $1 AND s.class_id = $2
               ORDER BY s.last_name, s.first_name"#,
        )
        .bind(subject_id)
        .bind(class_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| GradeRecord::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn save(&self, record: &GradeRecord) -> Result<GradeRecord, StoreError> {
        let span = db_operation_span!("INSERT", "grades", student_id = %record.student_id());

        async {
            let row = sqlx::query_as::<_, GradeRow>(&format!(
                r#"INSERT INTO grades (student_id, subject_id, teacher_id, note_cc, note_tp, note_dv, note_finale)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)
                   RETURNING {GRADE_COLUMNS}"#
            ))
            .bind(record.student_id())
            .bind(record.subject_id())
            .bind(record.teacher_id())
            .bind(record.note_cc())
            .bind(record.note_tp())
            .bind(record.note_dv())
            .bind(record.note_finale())
            .fetch_one(&self.db)
            .await?;

            let saved: GradeRecord = row.try_into()?;
            Ok::<_, StoreError>(saved)
        }
        .instrument(span)
        .await
    }

    async fn update(&self, record: &GradeRecord) -> Result<GradeRecord, StoreError> {
        let span = db_operation_span!("UPDATE", "grades", student_id = %record.student_id());

        async {
            let row = sqlx::query_as::<_, GradeRow>(&format!(
                r#"UPDATE grades
                   SET note_cc = $3, note_tp = $4, note_dv = $5, note_finale = $6, updated_at = NOW()
                   WHERE student_id = $1 AND subject_id = $2
                   RETURNING {GRADE_COLUMNS}"#
            ))
            .bind(record.student_id())
            .bind(record.subject_id())
            .bind(record.note_cc())
            .bind(record.note_tp())
            .bind(record.note_dv())
            .bind(record.note_finale())
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| StoreError::Rejected("Grade record no longer exists".to_string()))?;

            let updated: GradeRecord = row.try_into()?;
            Ok::<_, StoreError>(updated)
        }
        .instrument(span)
        .await
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn batch_update(&self, records: &[GradeRecord]) -> Vec<Result<GradeRecord, StoreError>> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let result = self.upsert(record).await;
            if let Err(e) = &result {
                warn!(student_id = %record.student_id(), error = %e, "Batch grade write failed");
            }
            results.push(result);
        }

        results
    }

    #[instrument(skip(self))]
    async fn delete(&self, student_id: StudentId, subject_id: SubjectId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM grades WHERE student_id = $1 AND subject_id = $2")
            .bind(student_id)
            .bind(subject_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn find_config_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<GradeConfig>, StoreError> {
        let row = sqlx::query_as::<_, ConfigRow>(
            "SELECT subject_id, pct_cc, pct_tp, pct_dv FROM grade_configs WHERE subject_id = $1",
        )
        .bind(subject_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(GradeConfig::try_from).transpose()?)
    }

    #[instrument(skip(self))]
    async fn save_config(&self, config: &GradeConfig) -> Result<GradeConfig, StoreError> {
        let row = sqlx::query_as::<_, ConfigRow>(
            r#"INSERT INTO grade_configs (subject_id, pct_cc, pct_tp, pct_dv)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (subject_id) DO UPDATE SET
                   pct_cc = EXCLUDED.pct_cc,
                   pct_tp = EXCLUDED.pct_tp,
                   pct_dv = EXCLUDED.pct_dv,
                   updated_at = NOW()
               RETURNING subject_id, pct_cc, pct_tp, pct_dv"#,
        )
        .bind(config.subject_id())
        .bind(config.pct_cc())
        .bind(config.pct_tp())
        .bind(config.pct_dv())
        .fetch_one(&self.db)
        .await?;

        Ok(row.try_into()?)
    }

    #[instrument(skip(self))]
    async fn find_students_by_class(&self, class_id: ClassId) -> Result<Vec<Student>, StoreError> {
        let students = sqlx::query_as::<_, Student>(
            r#"SELECT id, first_name, last_name, email, student_number, class_id
               FROM students
               WHERE class_id = $1
               ORDER BY last_name, first_name"#,
        )
        .bind(class_id)
        .fetch_all(&self.db)
        .await?;

        Ok(students)
    }

    #[instrument(skip(self))]
    async fn find_student_by_id(&self, student_id: StudentId) -> Result<Option<Student>, StoreError> {
        let student = sqlx::query_as::<_, Student>(
            r#"SELECT id, first_name, last_name, email, student_number, class_id
               FROM students
               WHERE id = $1"#,
        )
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    #[instrument(skip(self))]
    async fn find_subject_by_id(&self, subject_id: SubjectId) -> Result<Option<Subject>, StoreError> {
        let subject = sqlx::query_as::<_, Subject>(
            "SELECT id, name, description, coefficient FROM subjects WHERE id = $1",
        )
        .bind(subject_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(subject)
    }

    #[instrument(skip(self))]
    async fn find_class_by_id(&self, class_id: ClassId) -> Result<Option<SchoolClass>, StoreError> {
        let class = sqlx::query_as::<_, SchoolClass>("SELECT id, name FROM classes WHERE id = $1")
            .bind(class_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(class)
    }

    #[instrument(skip(self))]
    async fn get_statistics(
        &self,
        subject_id: SubjectId,
        class_id: ClassId,
    ) -> Result<SubjectClassStatistics, StoreError> {
        let stats = sqlx::query_as::<_, SubjectClassStatistics>(
            r#"WITH roster AS (
                   SELECT COUNT(*) AS total FROM students WHERE class_id = $2
               ),
               config AS (
                   SELECT COALESCE(MAX(pct_tp), 0) > 0 AS has_tp
                   FROM grade_configs WHERE subject_id = $1
               ),
               graded AS (
                   SELECT COUNT(*) FILTER (
                              WHERE g.note_cc IS NOT NULL OR g.note_tp IS NOT NULL OR g.note_dv IS NOT NULL
                          ) AS with_notes,
                          AVG(g.note_finale) AS average_grade,
                          COUNT(*) FILTER (WHERE g.note_finale >= 10) AS passed,
                          COUNT(*) FILTER (
                              WHERE g.note_cc IS NOT NULL AND g.note_dv IS NOT NULL
                                AND (g.note_tp IS NOT NULL OR NOT config.has_tp)
                          ) AS complete
                   FROM grades g
                   INNER JOIN students s ON s.id = g.student_id
                   CROSS JOIN config
                   WHERE g.subject_id = $1 AND s.class_id = $2
               )
               SELECT roster.total AS total_students,
                      graded.with_notes AS students_with_notes,
                      ROUND(graded.average_grade::numeric, 2)::float8 AS average_grade,
                      CASE WHEN roster.total > 0
                           THEN ROUND(100.0 * graded.passed / roster.total, 2)::float8
                           ELSE 0 END AS pass_rate,
                      CASE WHEN roster.total > 0
                           THEN ROUND(100.0 * graded.complete / roster.total, 2)::float8
                           ELSE 0 END AS completion_rate
               FROM roster, graded"#,
        )
        .bind(subject_id)
        .bind(class_id)
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    #[instrument(skip(self))]
    async fn find_teacher_assignments(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<TeacherAssignment>, StoreError> {
        let assignments = sqlx::query_as::<_, TeacherAssignment>(
            r#"SELECT ta.subject_id,
                      ta.class_id,
                      sub.name AS subject_name,
                      c.name AS class_name,
                      (SELECT COUNT(*) FROM students s WHERE s.class_id = ta.class_id) AS student_count
               FROM teacher_assignments ta
               INNER JOIN subjects sub ON sub.id = ta.subject_id
               INNER JOIN classes c ON c.id = ta.class_id
               WHERE ta.teacher_id = $1
               ORDER BY sub.name, c.name"#,
        )
        .bind(teacher_id)
        .fetch_all(&self.db)
        .await?;

        Ok(assignments)
    }
}
