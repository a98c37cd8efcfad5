use crate::catalog::Course;
use crate::model::{STATUS_FAILED, STATUS_PASSED};
use serde_json::{Map, Value};

/// Grades at or above this are "Passed"; exactly 60.00 passes.
pub const PASS_THRESHOLD: f64 = 60.0;

/// The calculator's single failure mode: a component input that is missing,
/// not numeric, or outside [0, 100]. Carries the offending component name.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcError {
    pub component: String,
}

/// Accepts JSON numbers and numeric strings; everything else (including NaN
/// and infinities, which parse as f64 but are useless as grades) is rejected.
pub fn component_value(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Weighted final grade for one course: the sum over the course's components,
/// in their defined order, of `value * weight / 100`. Every component defined
/// on the course must be present in `inputs` and lie in [0, 100].
///
/// Pure and deterministic; the caller formats the result and derives status.
pub fn final_grade(course: &Course, inputs: &Map<String, Value>) -> Result<f64, CalcError> {
    let mut total = 0.0_f64;

    for component in &course.components {
        let value = inputs
            .get(&component.name)
            .and_then(component_value)
            .ok_or_else(|| CalcError {
                component: component.name.clone(),
            })?;
        if !(0.0..=100.0).contains(&value) {
            return Err(CalcError {
                component: component.name.clone(),
            });
        }
        total += value * (component.weight as f64) / 100.0;
    }

    Ok(total)
}

pub fn status_for(final_grade: f64) -> &'static str {
    if final_grade >= PASS_THRESHOLD {
        STATUS_PASSED
    } else {
        STATUS_FAILED
    }
}

/// Two-decimal text form used everywhere the grade is persisted or shown.
pub fn format_grade(final_grade: f64) -> String {
    format!("{:.2}", final_grade)
}
