use crate::courses::{self, Course, CourseTab};
use crate::ipc::error::{respond, HandlerErr, HandlerResult};
use crate::ipc::helpers::{courses_param, ensure_within, optional, required};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn tab_and_query(req: &Request) -> Result<(CourseTab, String), HandlerErr> {
    let tab: Option<String> = optional(&req.params, "tab")?;
    let query: Option<String> = optional(&req.params, "query")?;
    Ok((
        CourseTab::parse(tab.as_deref().unwrap_or("all")),
        query.unwrap_or_default(),
    ))
}

fn handle_sort(state: &AppState, req: &Request) -> HandlerResult {
    let list = courses_param(state, &req.params)?;
    let levels = courses::sort_courses_by_prerequisites(&list);
    tracing::debug!(courses = list.len(), levels = levels.len(), "courses leveled");
    Ok(json!({ "levels": levels }))
}

fn handle_flatten(state: &AppState, req: &Request) -> HandlerResult {
    let levels: Vec<Vec<Course>> = required(&req.params, "levels")?;
    let total = levels.iter().map(Vec::len).sum();
    ensure_within("courses", total, state.config.max_courses)?;
    let borrowed: Vec<Vec<&Course>> = levels.iter().map(|l| l.iter().collect()).collect();
    Ok(json!({ "courses": courses::flatten_sorted_courses(&borrowed) }))
}

fn handle_ordered(state: &AppState, req: &Request) -> HandlerResult {
    let list = courses_param(state, &req.params)?;
    let (tab, query) = tab_and_query(req)?;
    let levels = courses::sort_courses_by_prerequisites(&list);
    let ordered = courses::flatten_sorted_courses(&levels);
    Ok(json!({ "courses": courses::filter_courses(ordered, tab, &query) }))
}

fn handle_filter(state: &AppState, req: &Request) -> HandlerResult {
    let list = courses_param(state, &req.params)?;
    let (tab, query) = tab_and_query(req)?;
    Ok(json!({ "courses": courses::filter_courses(&list, tab, &query) }))
}

fn handle_is_prerequisite(state: &AppState, req: &Request) -> HandlerResult {
    let list = courses_param(state, &req.params)?;
    let course_id: String = required(&req.params, "courseId")?;
    Ok(json!({
        "isPrerequisite": courses::is_prerequisite_for_other_courses(&list, &course_id)
    }))
}

fn handle_validate_prerequisites(state: &AppState, req: &Request) -> HandlerResult {
    let list = courses_param(state, &req.params)?;
    let course_id: Option<String> = optional(&req.params, "courseId")?;
    let prerequisite_ids: Vec<String> = optional(&req.params, "prerequisiteIds")?.unwrap_or_default();
    courses::validate_prerequisites(&list, course_id.as_deref(), &prerequisite_ids).map_err(|e| {
        HandlerErr::bad_params(e.to_string()).with_details(json!({
            "courseId": course_id,
            "prerequisiteIds": prerequisite_ids,
        }))
    })?;
    Ok(json!({ "valid": true }))
}

fn handle_remove(state: &AppState, req: &Request) -> HandlerResult {
    let list = courses_param(state, &req.params)?;
    let course_id: String = required(&req.params, "courseId")?;
    let removed = list.iter().any(|c| c.id == course_id);
    if removed && courses::is_prerequisite_for_other_courses(&list, &course_id) {
        tracing::debug!(course_id = %course_id, "removing a course other courses depend on");
    }
    let remaining = courses::remove_course(&list, &course_id);
    Ok(json!({ "removed": removed, "courses": remaining }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "courses.sort" => handle_sort(state, req),
        "courses.flatten" => handle_flatten(state, req),
        "courses.ordered" => handle_ordered(state, req),
        "courses.filter" => handle_filter(state, req),
        "courses.isPrerequisite" => handle_is_prerequisite(state, req),
        "courses.validatePrerequisites" => handle_validate_prerequisites(state, req),
        "courses.remove" => handle_remove(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, result))
}
