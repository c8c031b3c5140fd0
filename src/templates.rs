use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAssessment {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub assessments: Vec<TemplateAssessment>,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub deleted: bool,
    /// RFC 3339 timestamp; newer sorts first among otherwise equal matches.
    #[serde(default)]
    pub created_at: Option<String>,
}

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
/// Templates voted below this are hidden from search.
pub const MIN_VOTES: i64 = -1;

/// Search filters. `query` is matched against the template name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSearch {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMatch<'a> {
    #[serde(flatten)]
    pub template: &'a CalculatorTemplate,
    pub match_score: u8,
}

#[derive(Debug, Serialize)]
pub struct TemplatePage<'a> {
    pub templates: Vec<TemplateMatch<'a>>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy)]
struct FieldHits {
    name: bool,
    term: bool,
    year: bool,
    institution: bool,
}

impl FieldHits {
    fn score(self) -> u8 {
        [self.name, self.term, self.year, self.institution]
            .into_iter()
            .filter(|hit| *hit)
            .count() as u8
    }

    fn any(self) -> bool {
        self.score() > 0
    }
}

/// Case-insensitive substring test. An empty needle matches any present value.
fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

fn field_hits(template: &CalculatorTemplate, search: &TemplateSearch) -> FieldHits {
    let needle = |s: &Option<String>| s.as_deref().unwrap_or_default().to_lowercase();
    FieldHits {
        name: contains_ci(Some(template.name.as_str()), &needle(&search.query)),
        term: contains_ci(template.term.as_deref(), &needle(&search.term)),
        year: search.year.is_some_and(|y| template.year == Some(y)),
        institution: contains_ci(template.institution.as_deref(), &needle(&search.institution)),
    }
}

fn page_size(limit: Option<i64>) -> usize {
    match limit {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    }
}

fn page_number(page: Option<i64>) -> usize {
    page.and_then(|p| usize::try_from(p).ok()).unwrap_or(1).max(1)
}

/// Ranked, paginated template search.
///
/// A live template (not deleted, `vote_count >= MIN_VOTES`) is kept when its
/// name, term or institution contains the matching filter, or its year equals
/// `year`. The score is the number of matching fields. Ordering is score
/// descending, then institution hit, name hit, term hit, votes descending and
/// `created_at` descending. `total` counts every match before paging.
pub fn search_templates<'a>(
    templates: &'a [CalculatorTemplate],
    search: &TemplateSearch,
) -> TemplatePage<'a> {
    let limit = page_size(search.limit);
    let page = page_number(search.page);

    let mut hits: Vec<(&CalculatorTemplate, FieldHits)> = templates
        .iter()
        .filter(|t| !t.deleted && t.vote_count >= MIN_VOTES)
        .map(|t| (t, field_hits(t, search)))
        .filter(|(_, h)| h.any())
        .collect();

    hits.sort_by(|(ta, ha), (tb, hb)| rank(ta, *ha).cmp(&rank(tb, *hb)));

    let total = hits.len();
    let offset = (page - 1).saturating_mul(limit);
    let templates = hits
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(template, h)| TemplateMatch {
            template,
            match_score: h.score(),
        })
        .collect();

    TemplatePage {
        templates,
        total,
        page,
        limit,
    }
}

type RankKey<'a> = (Reverse<u8>, bool, bool, bool, Reverse<i64>, Reverse<Option<&'a str>>);

// Smaller sorts first; `false` on a hit flag means the field matched.
fn rank(template: &CalculatorTemplate, hits: FieldHits) -> RankKey<'_> {
    (
        Reverse(hits.score()),
        !hits.institution,
        !hits.name,
        !hits.term,
        Reverse(template.vote_count),
        Reverse(template.created_at.as_deref()),
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftAssessment {
    pub id: Uuid,
    pub name: String,
    pub weight: f64,
    pub grade: Option<f64>,
}

/// An unsaved calculator seeded from a template. Persisting it is the
/// caller's job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorDraft {
    pub id: Uuid,
    pub name: String,
    pub template_id: String,
    pub min_desired_grade: Option<f64>,
    pub created_at: String,
    pub assessments: Vec<DraftAssessment>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template {0} has no assessments")]
    NoAssessments(String),
}

pub fn instantiate_template(template: &CalculatorTemplate) -> Result<CalculatorDraft, TemplateError> {
    if template.assessments.is_empty() {
        return Err(TemplateError::NoAssessments(template.id.clone()));
    }

    let assessments = template
        .assessments
        .iter()
        .map(|a| DraftAssessment {
            id: Uuid::new_v4(),
            name: a.name.clone(),
            weight: a.weight,
            grade: None,
        })
        .collect();

    Ok(CalculatorDraft {
        id: Uuid::new_v4(),
        name: template.name.clone(),
        template_id: template.id.clone(),
        min_desired_grade: None,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        assessments,
    })
}
