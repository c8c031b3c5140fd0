use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

pub const NOT_AVAILABLE: &str = "N/A";

static GRADE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[0-9]+(\.[0-9]+)?(\s*/\s*[0-9]+(\.[0-9]+)?)?$").expect("grade pattern")
});

/// A grade or weight as the client sent it: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    fn as_text(&self) -> Cow<'_, str> {
        match self {
            NumericInput::Number(v) => Cow::Owned(v.to_string()),
            NumericInput::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Plain numeric coercion used for weights and targets. Blank or
    /// non-numeric text is `None`.
    pub fn to_number(&self) -> Option<f64> {
        let v = match self {
            NumericInput::Number(v) => *v,
            NumericInput::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    return None;
                }
                t.parse::<f64>().ok()?
            }
        };
        v.is_finite().then_some(v)
    }
}

impl From<f64> for NumericInput {
    fn from(v: f64) -> Self {
        NumericInput::Number(v)
    }
}

impl From<&str> for NumericInput {
    fn from(s: &str) -> Self {
        NumericInput::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub grade: Option<NumericInput>,
    #[serde(default)]
    pub weight: Option<NumericInput>,
}

impl Assessment {
    #[cfg(test)]
    pub fn new(grade: Option<NumericInput>, weight: Option<NumericInput>) -> Self {
        Self {
            name: None,
            grade,
            weight,
        }
    }

    pub fn grade_percent(&self) -> Option<f64> {
        parse_fraction_or_float(self.grade.as_ref())
    }

    pub fn weight_value(&self) -> Option<f64> {
        self.weight.as_ref().and_then(NumericInput::to_number)
    }
}

/// Outcome of a grade calculation. Renders as a two-decimal percentage
/// string or as the `N/A` sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradeResult {
    Percent(f64),
    NotAvailable,
}

impl GradeResult {
    fn from_value(v: f64) -> Self {
        if v.is_finite() {
            GradeResult::Percent(v)
        } else {
            GradeResult::NotAvailable
        }
    }

    pub fn as_percent(&self) -> Option<f64> {
        match self {
            GradeResult::Percent(v) => Some(*v),
            GradeResult::NotAvailable => None,
        }
    }
}

impl fmt::Display for GradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeResult::Percent(v) => f.write_str(&to_fixed_2(*v)),
            GradeResult::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for GradeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Half-up rounding to 2 decimals: `floor(100*x + 0.5) / 100`.
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

/// Fixed two-decimal rendering. Exact binary ties (e.g. 0.125) round away
/// from zero; everything else is correctly rounded from the exact value.
pub fn to_fixed_2(x: f64) -> String {
    let x = if x == 0.0 { 0.0 } else { x };
    let magnitude = x.abs();
    let doubled = (magnitude * 200.0).round();
    if doubled < 9_007_199_254_740_992.0
        && magnitude.mul_add(200.0, -doubled) == 0.0
        && doubled % 2.0 == 1.0
    {
        let hundredths = (doubled as u64 + 1) / 2;
        let sign = if x < 0.0 { "-" } else { "" };
        return format!("{}{}.{:02}", sign, hundredths / 100, hundredths % 100);
    }
    format!("{:.2}", x)
}

/// Parses a grade written as a percentage ("85", "85.5") or a fraction
/// ("17/20") into a percentage rounded to 2 decimals.
pub fn parse_fraction_or_float(value: Option<&NumericInput>) -> Option<f64> {
    let raw = value?.as_text();
    let s = raw.trim();
    if s.is_empty() || !GRADE_PATTERN.is_match(s) {
        return None;
    }
    if s.matches('-').count() > 1 || s.matches('/').count() > 1 {
        return None;
    }

    let percent = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            (num / den) * 100.0
        }
        None => s.parse().ok()?,
    };

    let rounded = round_off_2_decimals(percent);
    rounded.is_finite().then_some(rounded)
}

/// Weighted average over assessments that have both a usable grade and a
/// weight.
pub fn calculate_final_grade(assessments: &[Assessment]) -> GradeResult {
    let graded: Vec<(f64, f64)> = assessments
        .iter()
        .filter_map(|a| Some((a.grade_percent()?, a.weight_value()?)))
        .collect();
    if graded.is_empty() {
        return GradeResult::NotAvailable;
    }

    let total_weight: f64 = graded.iter().map(|(_, w)| w).sum();
    if total_weight == 0.0 {
        return GradeResult::NotAvailable;
    }
    let weighted_sum: f64 = graded.iter().map(|(g, w)| g * w).sum();

    GradeResult::from_value(weighted_sum / total_weight)
}

/// Average grade needed on the ungraded assessments to finish at
/// `min_desired_grade`. Not clamped to 0..=100.
pub fn calculate_required_grade(
    assessments: &[Assessment],
    min_desired_grade: Option<&NumericInput>,
) -> GradeResult {
    // Only a numeric zero counts as unset; the text "0" is a real target.
    let target = match min_desired_grade {
        None => return GradeResult::NotAvailable,
        Some(NumericInput::Number(v)) if *v == 0.0 => return GradeResult::NotAvailable,
        Some(input) => match input.to_number() {
            Some(v) => v,
            None => return GradeResult::NotAvailable,
        },
    };

    let mut total_weight = 0.0_f64;
    let mut remaining_weight = 0.0_f64;
    let mut remaining_count = 0_usize;
    let mut completed_weighted_sum = 0.0_f64;

    for a in assessments {
        let Some(weight) = a.weight_value() else {
            continue;
        };
        total_weight += weight;
        match a.grade_percent() {
            Some(grade) => completed_weighted_sum += grade * weight,
            None => {
                remaining_weight += weight;
                remaining_count += 1;
            }
        }
    }

    if remaining_count == 0 {
        return GradeResult::NotAvailable;
    }

    GradeResult::from_value((target * total_weight - completed_weighted_sum) / remaining_weight)
}

/// Sum of every present weight, graded or not.
pub fn weight_total(assessments: &[Assessment]) -> f64 {
    assessments.iter().filter_map(Assessment::weight_value).sum()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorSummary {
    pub final_grade: GradeResult,
    pub required_grade: GradeResult,
    pub weight_total: String,
    pub graded_count: usize,
    pub remaining_count: usize,
}

pub fn evaluate_calculator(
    assessments: &[Assessment],
    min_desired_grade: Option<&NumericInput>,
) -> CalculatorSummary {
    let mut graded_count = 0;
    let mut remaining_count = 0;
    for a in assessments.iter().filter(|a| a.weight_value().is_some()) {
        if a.grade_percent().is_some() {
            graded_count += 1;
        } else {
            remaining_count += 1;
        }
    }

    CalculatorSummary {
        final_grade: calculate_final_grade(assessments),
        required_grade: calculate_required_grade(assessments, min_desired_grade),
        weight_total: to_fixed_2(weight_total(assessments)),
        graded_count,
        remaining_count,
    }
}
