use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_PASSED: &str = "Passed";
pub const STATUS_FAILED: &str = "Failed";

/// Shared normalization for every case-insensitive comparison in the system
/// (course-name lookup and dedup, status filter matching). All call sites go
/// through this so the matching rules cannot drift apart.
pub fn norm_key(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

/// Maps arbitrary input to one of the two canonical status values.
/// Returns `None` for anything that is not `Passed`/`Failed` ignoring case.
pub fn normalize_status(input: &str) -> Option<&'static str> {
    match norm_key(input).as_str() {
        "passed" => Some(STATUS_PASSED),
        "failed" => Some(STATUS_FAILED),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub course_name: String,
    pub grade: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
    pub id: String,
    pub courses: Vec<CourseRecord>,
}

impl Student {
    /// Finds this student's record for a display name, matched after
    /// normalization.
    pub fn course_position(&self, course_name: &str) -> Option<usize> {
        let wanted = norm_key(course_name);
        self.courses
            .iter()
            .position(|c| norm_key(&c.course_name) == wanted)
    }
}

/// The whole persisted aggregate. Read and written as one unit; students keep
/// insertion order and ids are unique within the collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentCollection {
    pub students: Vec<Student>,
}

impl StudentCollection {
    pub fn find_student(&self, id: &str) -> Option<usize> {
        self.students.iter().position(|s| s.id == id)
    }

    /// Re-applies the read-side string rules to typed data so a write can
    /// never persist blank ids, names, or course fields.
    pub fn sanitized(&self) -> StudentCollection {
        let students = self
            .students
            .iter()
            .filter_map(|s| {
                let name = s.name.trim().to_string();
                let id = s.id.trim().to_string();
                if name.is_empty() || id.is_empty() {
                    return None;
                }
                let courses = s
                    .courses
                    .iter()
                    .filter_map(|c| {
                        let course_name = c.course_name.trim().to_string();
                        let grade = c.grade.trim().to_string();
                        let status = c.status.trim().to_string();
                        if course_name.is_empty() || grade.is_empty() || status.is_empty() {
                            return None;
                        }
                        Some(CourseRecord {
                            course_name,
                            grade,
                            status,
                        })
                    })
                    .collect();
                Some(Student { name, id, courses })
            })
            .collect();
        StudentCollection { students }
    }
}

/// Lenient load of the persisted document. Accepts the current
/// `{"students": [...]}` shape and the legacy bare-array shape; anything
/// unreadable (absent key, invalid JSON, wrong top-level type) degrades to an
/// empty collection. Malformed entries are dropped rather than reported so
/// the read path stays available over corrupted data.
pub fn normalize_document(raw: Option<&str>) -> StudentCollection {
    let Some(text) = raw else {
        return StudentCollection::default();
    };
    let Ok(parsed) = serde_json::from_str::<Value>(text) else {
        return StudentCollection::default();
    };

    let students_value = match &parsed {
        Value::Array(_) => parsed.clone(),
        Value::Object(obj) => obj.get("students").cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    };

    StudentCollection {
        students: sanitize_students(&students_value),
    }
}

fn sanitize_students(value: &Value) -> Vec<Student> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let name = coerce_trimmed(obj.get("name"))?;
            let id = coerce_trimmed(obj.get("id"))?;
            if name.is_empty() || id.is_empty() {
                return None;
            }

            let courses = obj
                .get("courses")
                .and_then(|v| v.as_array())
                .map(|list| {
                    list.iter()
                        .filter_map(|c| {
                            let rec = c.as_object()?;
                            let course_name = coerce_trimmed(rec.get("courseName"))?;
                            let grade = coerce_trimmed(rec.get("grade"))?;
                            let status = coerce_trimmed(rec.get("status"))?;
                            if course_name.is_empty() || grade.is_empty() || status.is_empty() {
                                return None;
                            }
                            Some(CourseRecord {
                                course_name,
                                grade,
                                status,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            Some(Student { name, id, courses })
        })
        .collect()
}

// Strings and numbers count as text (legacy documents carry numeric ids and
// grades); anything else is treated as a missing field.
fn coerce_trimmed(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
