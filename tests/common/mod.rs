#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use gradebook::modules::grades::{GradeService, GradeStore, StoreError};
use gradebook::modules::spreadsheet::WorkbookReader;
use gradebook_config::ImportConfig;
use gradebook_models::ids::{ClassId, GradeId, StudentId, SubjectId, TeacherId};
use gradebook_models::{
    ComponentScores, GradeConfig, GradeRecord, GradeStatistics, SchoolClass, Student, Subject,
    SubjectClassStatistics, TeacherAssignment,
};

pub const TEACHER: TeacherId = TeacherId::from_raw(7);
pub const CLASS_GL1: ClassId = ClassId::from_raw(1);
pub const CLASS_EMPTY: ClassId = ClassId::from_raw(2);
/// CC 40 / DV 60.
pub const MATH: SubjectId = SubjectId::from_raw(10);
/// CC 30 / TP 30 / DV 40.
pub const PHYSICS: SubjectId = SubjectId::from_raw(11);
/// No grade configuration.
pub const CHEMISTRY: SubjectId = SubjectId::from_raw(12);

pub const AMINA: StudentId = StudentId::from_raw(1);
pub const YOUSSEF: StudentId = StudentId::from_raw(2);
pub const SALMA: StudentId = StudentId::from_raw(3);
pub const KARIM: StudentId = StudentId::from_raw(4);
pub const LEILA: StudentId = StudentId::from_raw(5);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteCalls {
    pub save: usize,
    pub update: usize,
    pub batch_update: usize,
    pub save_config: usize,
}

impl WriteCalls {
    pub fn total(&self) -> usize {
        self.save + self.update + self.batch_update + self.save_config
    }
}

#[derive(Default)]
struct Inner {
    students: Vec<Student>,
    subjects: Vec<Subject>,
    classes: Vec<SchoolClass>,
    configs: HashMap<SubjectId, GradeConfig>,
    grades: HashMap<(StudentId, SubjectId), GradeRecord>,
    assignments: Vec<(TeacherId, SubjectId, ClassId)>,
    failing: HashSet<StudentId>,
    next_id: i64,
    calls: WriteCalls,
}

/// [`GradeStore`] kept in memory. Writes for students registered with
/// [`InMemoryGradeStore::failing_for`] are rejected.
#[derive(Default)]
pub struct InMemoryGradeStore {
    inner: Mutex<Inner>,
}

impl InMemoryGradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(self, f: impl FnOnce(&mut Inner)) -> Self {
        f(&mut self.inner.lock().unwrap());
        self
    }

    pub fn with_class(self, id: ClassId, name: &str) -> Self {
        self.with(|i| {
            i.classes.push(SchoolClass {
                id,
                name: name.to_string(),
            })
        })
    }

    pub fn with_subject(self, id: SubjectId, name: &str) -> Self {
        self.with(|i| {
            i.subjects.push(Subject {
                id,
                name: name.to_string(),
                description: None,
                coefficient: 1.0,
            })
        })
    }

    pub fn with_student(
        self,
        id: StudentId,
        first_name: &str,
        last_name: &str,
        student_number: &str,
        class_id: ClassId,
    ) -> Self {
        self.with(|i| {
            i.students.push(Student {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: Some(format!("{}@school.test", first_name.to_lowercase())),
                student_number: student_number.to_string(),
                class_id,
            })
        })
    }

    pub fn with_config(self, config: GradeConfig) -> Self {
        self.with(|i| {
            i.configs.insert(config.subject_id(), config);
        })
    }

    /// Seeds a stored grade; the final grade is computed with the subject's config.
    pub fn with_grade(
        self,
        student_id: StudentId,
        subject_id: SubjectId,
        cc: Option<f64>,
        tp: Option<f64>,
        dv: Option<f64>,
    ) -> Self {
        self.with(|i| {
            i.next_id += 1;
            let record = GradeRecord::create(
                student_id,
                subject_id,
                TEACHER,
                ComponentScores::new(cc, tp, dv),
            )
            .unwrap()
            .with_final_grade(i.configs.get(&subject_id))
            .with_id(GradeId::from_raw(i.next_id));
            i.grades.insert((student_id, subject_id), record);
        })
    }

    pub fn with_assignment(self, teacher: TeacherId, subject: SubjectId, class: ClassId) -> Self {
        self.with(|i| i.assignments.push((teacher, subject, class)))
    }

    pub fn failing_for(self, student_id: StudentId) -> Self {
        self.with(|i| {
            i.failing.insert(student_id);
        })
    }

    pub fn grade(&self, student_id: StudentId, subject_id: SubjectId) -> Option<GradeRecord> {
        self.inner
            .lock()
            .unwrap()
            .grades
            .get(&(student_id, subject_id))
            .cloned()
    }

    pub fn grade_count(&self) -> usize {
        self.inner.lock().unwrap().grades.len()
    }

    pub fn calls(&self) -> WriteCalls {
        self.inner.lock().unwrap().calls
    }

    pub fn config(&self, subject_id: SubjectId) -> Option<GradeConfig> {
        self.inner.lock().unwrap().configs.get(&subject_id).copied()
    }

    fn write(inner: &mut Inner, record: &GradeRecord) -> Result<GradeRecord, StoreError> {
        if inner.failing.contains(&record.student_id()) {
            return Err(StoreError::Rejected("connection reset".to_string()));
        }

        let key = (record.student_id(), record.subject_id());
        let id = match inner.grades.get(&key).and_then(GradeRecord::id) {
            Some(id) => id,
            None => {
                inner.next_id += 1;
                GradeId::from_raw(inner.next_id)
            }
        };

        let stored = record.clone().with_id(id);
        inner.grades.insert(key, stored.clone());
        Ok(stored)
    }
}

impl GradeStore for InMemoryGradeStore {
    async fn find_by_student_and_subject(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
    ) -> Result<Option<GradeRecord>, StoreError> {
        Ok(self.grade(student_id, subject_id))
    }

    async fn find_by_subject_and_class(
        &self,
        subject_id: SubjectId,
        class_id: ClassId,
    ) -> Result<Vec<GradeRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .filter_map(|s| inner.grades.get(&(s.id, subject_id)).cloned())
            .collect())
    }

    async fn save(&self, record: &GradeRecord) -> Result<GradeRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.save += 1;
        Self::write(&mut inner, record)
    }

    async fn update(&self, record: &GradeRecord) -> Result<GradeRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.update += 1;
        if !inner
            .grades
            .contains_key(&(record.student_id(), record.subject_id()))
        {
            return Err(StoreError::Rejected(
                "Grade record no longer exists".to_string(),
            ));
        }
        Self::write(&mut inner, record)
    }

    async fn batch_update(&self, records: &[GradeRecord]) -> Vec<Result<GradeRecord, StoreError>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.batch_update += 1;
        records.iter().map(|r| Self::write(&mut inner, r)).collect()
    }

    async fn delete(&self, student_id: StudentId, subject_id: SubjectId) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .grades
            .remove(&(student_id, subject_id))
            .is_some())
    }

    async fn find_config_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<GradeConfig>, StoreError> {
        Ok(self.config(subject_id))
    }

    async fn save_config(&self, config: &GradeConfig) -> Result<GradeConfig, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.save_config += 1;
        inner.configs.insert(config.subject_id(), *config);
        Ok(*config)
    }

    async fn find_students_by_class(&self, class_id: ClassId) -> Result<Vec<Student>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut students: Vec<Student> = inner
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect();
        students.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(students)
    }

    async fn find_student_by_id(&self, student_id: StudentId) -> Result<Option<Student>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.students.iter().find(|s| s.id == student_id).cloned())
    }

    async fn find_subject_by_id(&self, subject_id: SubjectId) -> Result<Option<Subject>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.subjects.iter().find(|s| s.id == subject_id).cloned())
    }

    async fn find_class_by_id(&self, class_id: ClassId) -> Result<Option<SchoolClass>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.classes.iter().find(|c| c.id == class_id).cloned())
    }

    async fn get_statistics(
        &self,
        subject_id: SubjectId,
        class_id: ClassId,
    ) -> Result<SubjectClassStatistics, StoreError> {
        let students = self.find_students_by_class(class_id).await?;
        let records = self.find_by_subject_and_class(subject_id, class_id).await?;
        let has_tp = self.config(subject_id).is_some_and(|c| c.has_tp());
        let stats = GradeStatistics::compute(students.len(), records.iter(), has_tp);

        Ok(SubjectClassStatistics {
            total_students: stats.total_students as i64,
            students_with_notes: stats.students_with_notes as i64,
            average_grade: stats.average_final,
            pass_rate: stats.pass_rate,
            completion_rate: stats.completion_rate,
        })
    }

    async fn find_teacher_assignments(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<TeacherAssignment>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let name_of_subject = |id: SubjectId| {
            inner
                .subjects
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.name.clone())
                .unwrap_or_default()
        };
        let name_of_class = |id: ClassId| {
            inner
                .classes
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.name.clone())
                .unwrap_or_default()
        };

        Ok(inner
            .assignments
            .iter()
            .filter(|(teacher, _, _)| *teacher == teacher_id)
            .map(|&(_, subject_id, class_id)| TeacherAssignment {
                subject_id,
                class_id,
                subject_name: name_of_subject(subject_id),
                class_name: name_of_class(class_id),
                student_count: inner
                    .students
                    .iter()
                    .filter(|s| s.class_id == class_id)
                    .count() as i64,
            })
            .collect())
    }
}

/// Class GL1 with three students, Math (CC/DV), Physics (CC/TP/DV) and
/// Chemistry (no configuration), plus an empty class.
pub fn school() -> InMemoryGradeStore {
    InMemoryGradeStore::new()
        .with_class(CLASS_GL1, "GL1")
        .with_class(CLASS_EMPTY, "GL2")
        .with_subject(MATH, "Mathematiques")
        .with_subject(PHYSICS, "Physique")
        .with_subject(CHEMISTRY, "Chimie")
        .with_config(GradeConfig::standard(MATH))
        .with_config(GradeConfig::with_tp(PHYSICS))
        .with_student(AMINA, "Amina", "Trabelsi", "2024001", CLASS_GL1)
        .with_student(YOUSSEF, "Youssef", "Haddad", "2024002", CLASS_GL1)
        .with_student(SALMA, "Salma", "Ben Salah", "2024003", CLASS_GL1)
}

/// [`school`] with two more students, for five-student batches.
pub fn larger_school() -> InMemoryGradeStore {
    school()
        .with_student(KARIM, "Karim", "Mansour", "2024004", CLASS_GL1)
        .with_student(LEILA, "Leila", "Gharbi", "2024005", CLASS_GL1)
}

pub fn service(store: InMemoryGradeStore) -> GradeService<InMemoryGradeStore, WorkbookReader> {
    service_with(store, ImportConfig::default())
}

pub fn service_with(
    store: InMemoryGradeStore,
    import_config: ImportConfig,
) -> GradeService<InMemoryGradeStore, WorkbookReader> {
    GradeService::new(
        store,
        WorkbookReader::new(import_config.max_rows),
        import_config,
    )
}

/// Joins lines into a CSV upload.
pub fn csv(lines: &[&str]) -> Vec<u8> {
    let mut body = lines.join("\n");
    body.push('\n');
    body.into_bytes()
}
