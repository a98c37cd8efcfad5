use crate::calc::{self, CalcError};
use crate::catalog::{Catalog, Course};
use crate::model::{
    norm_key, normalize_status, CourseRecord, Student, StudentCollection,
};
use crate::store::DocumentStore;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The one key the whole aggregate lives under.
pub const DATA_KEY: &str = "grade_system:data";

pub type RepoResult<T> = Result<T, GradeError>;

/// Domain errors for repository and calculator operations. Every variant maps
/// to one wire code; validation variants are always raised before anything is
/// written to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeError {
    InvalidComponentGrade { component: String },
    MissingComponentGrade { component: String },
    UnknownCourse { course: String },
    UnknownCourseType { course: String },
    DuplicateCourseGrade { course: String },
    StudentNotFound { student_id: String },
    CourseNotFound { course: String },
    InvalidStatusFilter { status: String },
    StorageUnavailable { reason: String },
}

impl GradeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidComponentGrade { .. } => "invalid_component_grade",
            Self::MissingComponentGrade { .. } => "missing_component_grade",
            Self::UnknownCourse { .. } => "unknown_course",
            Self::UnknownCourseType { .. } => "unknown_course_type",
            Self::DuplicateCourseGrade { .. } => "duplicate_course_grade",
            Self::StudentNotFound { .. } => "student_not_found",
            Self::CourseNotFound { .. } => "course_not_found",
            Self::InvalidStatusFilter { .. } => "invalid_status_filter",
            Self::StorageUnavailable { .. } => "storage_unavailable",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::InvalidComponentGrade { component } => {
                format!("{} grade must be between 0 and 100", component)
            }
            Self::MissingComponentGrade { component } => {
                format!("{} grade is required", component)
            }
            Self::UnknownCourse { .. } => "unknown course key".to_string(),
            Self::UnknownCourseType { .. } => {
                "cannot update this course (unknown course type)".to_string()
            }
            Self::DuplicateCourseGrade { .. } => {
                "student already has a grade for this course".to_string()
            }
            Self::StudentNotFound { .. } => "student not found".to_string(),
            Self::CourseNotFound { .. } => "course not found for this student".to_string(),
            Self::InvalidStatusFilter { .. } => {
                "status filter must be Passed or Failed".to_string()
            }
            Self::StorageUnavailable { .. } => "data store unavailable".to_string(),
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            Self::InvalidComponentGrade { component } | Self::MissingComponentGrade { component } => {
                Some(json!({ "component": component }))
            }
            Self::UnknownCourse { course }
            | Self::UnknownCourseType { course }
            | Self::DuplicateCourseGrade { course }
            | Self::CourseNotFound { course } => Some(json!({ "course": course })),
            Self::StudentNotFound { student_id } => Some(json!({ "studentId": student_id })),
            Self::InvalidStatusFilter { status } => Some(json!({ "status": status })),
            Self::StorageUnavailable { reason } => Some(json!({ "reason": reason })),
        }
    }
}

impl Display for GradeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl Error for GradeError {}

impl From<CalcError> for GradeError {
    fn from(err: CalcError) -> Self {
        Self::InvalidComponentGrade {
            component: err.component,
        }
    }
}

/// Validated view filter for `list`. Filtering never mutates storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentFilter {
    pub id_contains: Option<String>,
    pub status: Option<&'static str>,
}

/// Builds a filter from raw inputs. A blank search or status means "no
/// filter"; a non-blank status must match a canonical value ignoring case.
pub fn parse_filter(search_by_id: Option<&str>, status: Option<&str>) -> RepoResult<StudentFilter> {
    let id_contains = search_by_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => Some(normalize_status(raw).ok_or_else(|| GradeError::InvalidStatusFilter {
            status: raw.to_string(),
        })?),
    };

    Ok(StudentFilter {
        id_contains,
        status,
    })
}

/// Confirmation slip for a submitted grade, echoing the submitted identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSlip {
    pub name: String,
    pub id: String,
    pub course: String,
    pub grade: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseDeletion {
    /// True when removing the course emptied the student and the student was
    /// removed as well.
    pub student_removed: bool,
}

/// All access to the student collection. Every operation is one full
/// read-modify-write cycle: load the document, normalize it, mutate it in
/// memory, write it back whole. Requests are served one at a time in this
/// process; concurrent processes sharing a store keep last-writer-wins
/// semantics, so a racing writer's change can be silently lost.
pub struct StudentRepo<'a> {
    store: &'a dyn DocumentStore,
    catalog: &'a Catalog,
}

impl<'a> StudentRepo<'a> {
    pub fn new(store: &'a dyn DocumentStore, catalog: &'a Catalog) -> Self {
        Self { store, catalog }
    }

    /// Seeds the empty document when the key is absent. Returns whether a
    /// seed write happened.
    pub fn ensure_initialized(&self) -> RepoResult<bool> {
        let existing = self
            .store
            .get(DATA_KEY)
            .map_err(|e| GradeError::StorageUnavailable {
                reason: e.to_string(),
            })?;
        if existing.is_some() {
            return Ok(false);
        }
        self.save(&StudentCollection::default())?;
        Ok(true)
    }

    /// Replaces the whole document with externally supplied text, normalized
    /// the same way reads are. Returns how many students survived.
    pub fn replace_document(&self, raw: &str) -> RepoResult<usize> {
        let collection = crate::model::normalize_document(Some(raw));
        let count = collection.students.len();
        self.save(&collection)?;
        Ok(count)
    }

    fn load(&self) -> RepoResult<StudentCollection> {
        let raw = self
            .store
            .get(DATA_KEY)
            .map_err(|e| GradeError::StorageUnavailable {
                reason: e.to_string(),
            })?;
        Ok(crate::model::normalize_document(raw.as_deref()))
    }

    fn save(&self, collection: &StudentCollection) -> RepoResult<()> {
        // Sanitize on the way out too; no path may persist malformed records.
        let clean = collection.sanitized();
        let text = serde_json::to_string_pretty(&clean).map_err(|e| {
            GradeError::StorageUnavailable {
                reason: e.to_string(),
            }
        })?;
        self.store
            .set(DATA_KEY, &text)
            .map_err(|e| GradeError::StorageUnavailable {
                reason: e.to_string(),
            })
    }

    /// Returns the (possibly filtered) student view. A status filter narrows
    /// each student's course list to matching records and drops students left
    /// with none; an id filter is a case-sensitive substring match.
    pub fn list(&self, filter: &StudentFilter) -> RepoResult<Vec<Student>> {
        let collection = self.load()?;
        let mut students = collection.students;

        if let Some(needle) = &filter.id_contains {
            students.retain(|s| s.id.contains(needle.as_str()));
        }

        if let Some(wanted) = filter.status {
            let wanted = norm_key(wanted);
            students = students
                .into_iter()
                .map(|mut s| {
                    s.courses.retain(|c| norm_key(&c.status) == wanted);
                    s
                })
                .filter(|s| !s.courses.is_empty())
                .collect();
        }

        Ok(students)
    }

    /// First grade submission for a student+course pair. Creates the student
    /// on first contact; re-submitting a course the student already has fails
    /// (updates must go through `update_grade`).
    pub fn submit_grade(
        &self,
        student_id: &str,
        student_name: &str,
        course: &Course,
        grades: &Map<String, Value>,
    ) -> RepoResult<GradeSlip> {
        let final_grade = calc::final_grade(course, grades)?;
        let grade = calc::format_grade(final_grade);
        let status = calc::status_for(final_grade).to_string();

        let mut collection = self.load()?;
        let record = CourseRecord {
            course_name: course.name.clone(),
            grade: grade.clone(),
            status: status.clone(),
        };

        match collection.find_student(student_id) {
            Some(pos) => {
                let student = &mut collection.students[pos];
                if student.course_position(&course.name).is_some() {
                    return Err(GradeError::DuplicateCourseGrade {
                        course: course.name.clone(),
                    });
                }
                student.courses.push(record);
            }
            None => collection.students.push(Student {
                name: student_name.to_string(),
                id: student_id.to_string(),
                courses: vec![record],
            }),
        }

        self.save(&collection)?;

        Ok(GradeSlip {
            name: student_name.to_string(),
            id: student_id.to_string(),
            course: course.name.clone(),
            grade,
            status,
        })
    }

    /// Recomputes one existing course record in place. The course definition
    /// is resolved from the *stored* course name, so a record whose course no
    /// longer exists in the catalog cannot be updated.
    pub fn update_grade(
        &self,
        student_id: &str,
        course_name: &str,
        grades: &Map<String, Value>,
    ) -> RepoResult<CourseRecord> {
        let mut collection = self.load()?;
        let student_pos =
            collection
                .find_student(student_id)
                .ok_or_else(|| GradeError::StudentNotFound {
                    student_id: student_id.to_string(),
                })?;
        let student = &mut collection.students[student_pos];
        let course_pos =
            student
                .course_position(course_name)
                .ok_or_else(|| GradeError::CourseNotFound {
                    course: course_name.to_string(),
                })?;

        let stored_name = student.courses[course_pos].course_name.clone();
        let course = self.catalog.by_display_name(&stored_name).ok_or_else(|| {
            GradeError::UnknownCourseType {
                course: stored_name.clone(),
            }
        })?;

        // Presence first: an absent or blank component is "missing", not
        // "invalid"; numeric validation happens in the calculator.
        for component in &course.components {
            let present = match grades.get(&component.name) {
                None => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(GradeError::MissingComponentGrade {
                    component: component.name.clone(),
                });
            }
        }

        let final_grade = calc::final_grade(course, grades)?;
        let record = &mut student.courses[course_pos];
        record.grade = calc::format_grade(final_grade);
        record.status = calc::status_for(final_grade).to_string();
        let updated = record.clone();

        self.save(&collection)?;
        Ok(updated)
    }

    pub fn delete_student(&self, student_id: &str) -> RepoResult<()> {
        let mut collection = self.load()?;
        let before = collection.students.len();
        collection.students.retain(|s| s.id != student_id);
        if collection.students.len() == before {
            return Err(GradeError::StudentNotFound {
                student_id: student_id.to_string(),
            });
        }
        self.save(&collection)
    }

    /// Removes a student's record for a course; removing the last one removes
    /// the student too, so the collection never keeps students without
    /// courses.
    pub fn delete_course(&self, student_id: &str, course_name: &str) -> RepoResult<CourseDeletion> {
        let mut collection = self.load()?;
        let student_pos =
            collection
                .find_student(student_id)
                .ok_or_else(|| GradeError::StudentNotFound {
                    student_id: student_id.to_string(),
                })?;

        let student = &mut collection.students[student_pos];
        let wanted = norm_key(course_name);
        let before = student.courses.len();
        student.courses.retain(|c| norm_key(&c.course_name) != wanted);
        if student.courses.len() == before {
            return Err(GradeError::CourseNotFound {
                course: course_name.to_string(),
            });
        }

        let student_removed = student.courses.is_empty();
        if student_removed {
            collection.students.remove(student_pos);
        }

        self.save(&collection)?;
        Ok(CourseDeletion { student_removed })
    }
}
