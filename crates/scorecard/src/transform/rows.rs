use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkSiteRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderTypeRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRow {
    pub id: String,
    pub name: String,
    pub provider_type_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub role_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationPeriodRow {
    pub id: String,
    pub date_key: Option<String>,
}

/// Calendar attributes for one distinct date key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRow {
    pub date_key: String,
    pub year: i32,
    pub month_num: u32,
    pub month_name: &'static str,
    pub day_num: u32,
    /// Sunday is 0.
    pub weekday_num: u32,
    pub weekday_name: &'static str,
    pub quarter: String,
}

/// Expected evaluation of a provider by a user at a work site in a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObligationFact {
    pub id: String,
    pub source_plan_id: Option<String>,
    pub period_id: String,
    pub work_site_id: String,
    pub provider_id: String,
    pub user_id: String,
    pub fulfilled: bool,
    /// False for rows minted from a submission that no plan asked for.
    pub planned: bool,
}

/// One scored rubric answer of a submitted evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreFact {
    pub id: String,
    pub source_evaluation_id: String,
    pub obligation_fact_id: String,
    pub criterion_id: String,
    pub evaluator_user_id: String,
    pub points: f64,
    pub max_points: f64,
    pub date_key: Option<String>,
}
