use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::calc::Assessment;
use crate::courses::Course;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::AppState;

/// Decodes `params.<key>`; absent and null are both `None`.
pub fn optional<T: DeserializeOwned>(params: &Value, key: &str) -> Result<Option<T>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
            HandlerErr::bad_params(format!("invalid params.{}: {}", key, e))
        }),
    }
}

pub fn required<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, HandlerErr> {
    optional(params, key)?.ok_or_else(|| HandlerErr::bad_params(format!("missing params.{}", key)))
}

pub fn ensure_within(what: &str, count: usize, max: usize) -> Result<(), HandlerErr> {
    if count > max {
        return Err(HandlerErr {
            code: "too_large",
            message: format!("too many {} (max {})", what, max),
            details: Some(json!({ "count": count, "max": max })),
        });
    }
    Ok(())
}

pub fn assessments_param(state: &AppState, params: &Value) -> Result<Vec<Assessment>, HandlerErr> {
    let assessments: Vec<Assessment> = required(params, "assessments")?;
    ensure_within("assessments", assessments.len(), state.config.max_assessments)?;
    Ok(assessments)
}

pub fn courses_param(state: &AppState, params: &Value) -> Result<Vec<Course>, HandlerErr> {
    let courses: Vec<Course> = required(params, "courses")?;
    ensure_within("courses", courses.len(), state.config.max_courses)?;
    Ok(courses)
}
