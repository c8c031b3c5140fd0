use crate::ipc::error::{respond, HandlerErr, HandlerResult};
use crate::ipc::helpers::{ensure_within, required};
use crate::ipc::types::{AppState, Request};
use crate::templates::{self, CalculatorTemplate, TemplateSearch};
use serde_json::json;

fn handle_instantiate(state: &AppState, req: &Request) -> HandlerResult {
    let template: CalculatorTemplate = required(&req.params, "template")?;
    ensure_within(
        "assessments",
        template.assessments.len(),
        state.config.max_assessments,
    )?;
    let draft = templates::instantiate_template(&template)
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    tracing::info!(
        template_id = %template.id,
        calculator_id = %draft.id,
        assessments = draft.assessments.len(),
        "calculator drafted from template"
    );
    Ok(json!({ "calculator": draft }))
}

fn handle_search(state: &AppState, req: &Request) -> HandlerResult {
    let list: Vec<CalculatorTemplate> = required(&req.params, "templates")?;
    ensure_within("templates", list.len(), state.config.max_templates)?;
    let search: TemplateSearch = serde_json::from_value(req.params.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid search filters: {}", e)))?;
    let page = templates::search_templates(&list, &search);
    tracing::debug!(
        total = page.total,
        returned = page.templates.len(),
        page = page.page,
        "template search"
    );
    Ok(json!(page))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "templates.instantiate" => handle_instantiate(state, req),
        "templates.search" => handle_search(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, result))
}
