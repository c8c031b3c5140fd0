use crate::calc::{self, NumericInput};
use crate::ipc::error::{respond, HandlerResult};
use crate::ipc::helpers::{assessments_param, optional};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_parse(req: &Request) -> HandlerResult {
    let value: Option<NumericInput> = optional(&req.params, "value")?;
    Ok(json!({ "percent": calc::parse_fraction_or_float(value.as_ref()) }))
}

fn handle_final(state: &AppState, req: &Request) -> HandlerResult {
    let assessments = assessments_param(state, &req.params)?;
    let grade = calc::calculate_final_grade(&assessments);
    Ok(json!({
        "finalGrade": grade,
        "value": grade.as_percent(),
    }))
}

fn handle_required(state: &AppState, req: &Request) -> HandlerResult {
    let assessments = assessments_param(state, &req.params)?;
    let target: Option<NumericInput> = optional(&req.params, "minDesiredGrade")?;
    let grade = calc::calculate_required_grade(&assessments, target.as_ref());
    Ok(json!({
        "requiredGrade": grade,
        "value": grade.as_percent(),
    }))
}

fn handle_evaluate(state: &AppState, req: &Request) -> HandlerResult {
    let assessments = assessments_param(state, &req.params)?;
    let target: Option<NumericInput> = optional(&req.params, "minDesiredGrade")?;
    let summary = calc::evaluate_calculator(&assessments, target.as_ref());
    Ok(json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grades.parse" => handle_parse(req),
        "grades.final" => handle_final(state, req),
        "grades.required" => handle_required(state, req),
        "calculators.evaluate" => handle_evaluate(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, result))
}
