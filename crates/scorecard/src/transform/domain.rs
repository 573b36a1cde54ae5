//! Typed entities parsed from raw upstream records.
//!
//! This is the only place where loosely typed cells are coerced; later
//! stages work with these structs exclusively.

use super::dates::format_date;
use super::scores::RUBRIC_COLUMNS;
use super::TransformError;
use crate::source::{RawRecord, SourceTable, SourceTables};
use std::collections::HashSet;
use tracing::warn;

mod columns {
    pub(super) const PROVIDER_NAME: &str = "nombre_proveedor";
    pub(super) const PROVIDER_TYPE_ID: &str = "id_tipo_proveedor";
    pub(super) const PROVIDER_TYPE_NAME: &str = "nombre_tipo_proveedor";
    pub(super) const WORK_SITE_NAME: &str = "nombre_obra";
    pub(super) const USER_NAME: &str = "nombre_usuario";
    pub(super) const ROLE_ID: &str = "id_rol";
    pub(super) const ROLE_NAME: &str = "nombre_rol";
    pub(super) const ROLE_USERS: &str = "Related usuarios";
    pub(super) const WORK_SITE_ID: &str = "id_obra";
    pub(super) const USER_ID: &str = "id_usuario";
    pub(super) const PERIOD_DATE: &str = "fecha_corte";
    pub(super) const PERIOD_PLANS: &str = "Related planes_de_evaluacions";
    pub(super) const PROVIDER_ID: &str = "id_proveedor";
    pub(super) const PERIOD_ID: &str = "id_corte_evaluacion";
    pub(super) const EVALUATOR: &str = "evaluador";
    pub(super) const EVALUATION_DATE: &str = "fecha_evaluacion";
    pub(super) const CRITERION_ID: &str = "id_criterio";
    pub(super) const CRITERION_NAME: &str = "nombre_criterio";
    pub(super) const POINTS: &str = "puntaje";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    pub id: String,
    pub name: Option<String>,
    pub provider_type_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderType {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkSite {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub role_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub id: String,
    pub name: Option<String>,
    pub related_user_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteAssignment {
    pub work_site_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeRoleLink {
    pub provider_type_id: String,
    pub role_id: String,
}

/// An evaluation cut.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationPeriod {
    pub id: String,
    pub date_key: Option<String>,
    pub related_plan_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationPlan {
    pub id: String,
    pub provider_id: Option<String>,
    pub work_site_id: Option<String>,
    pub period_id: Option<String>,
}

/// A populated rubric cell: the column position and its answer code.
#[derive(Debug, Clone, PartialEq)]
pub struct RubricAnswer {
    pub column: &'static str,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedEvaluation {
    pub id: String,
    pub work_site_id: String,
    pub provider_id: String,
    pub period_id: String,
    pub evaluator_id: String,
    pub date_key: Option<String>,
    pub answers: Vec<RubricAnswer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDefinition {
    pub id: String,
    pub provider_type_id: String,
    pub criterion_id: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub id: String,
    pub name: Option<String>,
}

type ParseResult<T> = Result<T, &'static str>;

fn required_id(record: &RawRecord) -> ParseResult<String> {
    record.id().ok_or("missing Row ID")
}

fn required(record: &RawRecord, column: &'static str, reason: &'static str) -> ParseResult<String> {
    record.text(column).ok_or(reason)
}

impl Provider {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            id: required_id(record)?,
            name: record.text(columns::PROVIDER_NAME),
            provider_type_id: record.text(columns::PROVIDER_TYPE_ID),
        })
    }
}

impl ProviderType {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            id: required_id(record)?,
            name: record.text(columns::PROVIDER_TYPE_NAME),
        })
    }
}

impl WorkSite {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            id: required_id(record)?,
            name: record.text(columns::WORK_SITE_NAME),
        })
    }
}

impl User {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            id: required_id(record)?,
            name: record.text(columns::USER_NAME),
            role_id: record.text(columns::ROLE_ID),
        })
    }
}

impl Role {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            id: required_id(record)?,
            name: record.text(columns::ROLE_NAME),
            related_user_ids: record.list(columns::ROLE_USERS),
        })
    }
}

impl SiteAssignment {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            work_site_id: required(record, columns::WORK_SITE_ID, "missing work site")?,
            user_id: required(record, columns::USER_ID, "missing user")?,
        })
    }
}

impl TypeRoleLink {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            provider_type_id: required(record, columns::PROVIDER_TYPE_ID, "missing provider type")?,
            role_id: required(record, columns::ROLE_ID, "missing role")?,
        })
    }
}

impl EvaluationPeriod {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            id: required_id(record)?,
            date_key: format_date(record.text(columns::PERIOD_DATE).as_deref()),
            related_plan_ids: record.list(columns::PERIOD_PLANS),
        })
    }
}

impl EvaluationPlan {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            id: required_id(record)?,
            provider_id: record.text(columns::PROVIDER_ID),
            work_site_id: record.text(columns::WORK_SITE_ID),
            period_id: record.text(columns::PERIOD_ID),
        })
    }
}

impl SubmittedEvaluation {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        let answers = RUBRIC_COLUMNS
            .into_iter()
            .filter_map(|column| {
                record.text(column).map(|code| RubricAnswer { column, code })
            })
            .collect();

        Ok(Self {
            id: required_id(record)?,
            work_site_id: required(record, columns::WORK_SITE_ID, "missing work site")?,
            provider_id: required(record, columns::PROVIDER_ID, "missing provider")?,
            period_id: required(record, columns::PERIOD_ID, "missing evaluation period")?,
            evaluator_id: required(record, columns::EVALUATOR, "missing evaluator")?,
            date_key: format_date(record.text(columns::EVALUATION_DATE).as_deref()),
            answers,
        })
    }
}

impl ScoreDefinition {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        let id = required_id(record)?;
        let provider_type_id = required(record, columns::PROVIDER_TYPE_ID, "missing provider type")?;
        let criterion_id = required(record, columns::CRITERION_ID, "missing criterion")?;
        let points = match record.number(columns::POINTS) {
            Some(points) => points,
            None => {
                warn!(
                    score_definition = %id,
                    raw = ?record.text(columns::POINTS),
                    "non-numeric points, counting as 0"
                );
                0.0
            }
        };

        Ok(Self {
            id,
            provider_type_id,
            criterion_id,
            points,
        })
    }
}

impl Criterion {
    fn parse(record: &RawRecord) -> ParseResult<Self> {
        Ok(Self {
            id: required_id(record)?,
            name: record.text(columns::CRITERION_NAME),
        })
    }
}

/// Every upstream table parsed into typed entities.
#[derive(Debug, Clone, Default)]
pub struct SourceModel {
    pub providers: Vec<Provider>,
    pub provider_types: Vec<ProviderType>,
    pub work_sites: Vec<WorkSite>,
    pub users: Vec<User>,
    pub roles: Vec<Role>,
    pub site_assignments: Vec<SiteAssignment>,
    pub type_role_links: Vec<TypeRoleLink>,
    pub periods: Vec<EvaluationPeriod>,
    pub plans: Vec<EvaluationPlan>,
    pub evaluations: Vec<SubmittedEvaluation>,
    pub score_definitions: Vec<ScoreDefinition>,
    pub criteria: Vec<Criterion>,
    /// Date keys of every raw evaluation and cut row, including rows the
    /// parse above dropped.
    pub date_keys: Vec<String>,
}

impl SourceModel {
    /// Parses all tables, failing only when a mandatory table is absent.
    pub fn parse(tables: &SourceTables) -> Result<Self, TransformError> {
        if let Some(table) = SourceTable::ordered()
            .into_iter()
            .find(|table| table.is_mandatory() && !tables.contains(*table))
        {
            return Err(TransformError::MissingInput {
                table: table.native_name(),
            });
        }

        Ok(Self {
            providers: parse_table(tables, SourceTable::Providers, Provider::parse),
            provider_types: parse_table(tables, SourceTable::ProviderTypes, ProviderType::parse),
            work_sites: parse_table(tables, SourceTable::WorkSites, WorkSite::parse),
            users: parse_table(tables, SourceTable::Users, User::parse),
            roles: parse_table(tables, SourceTable::Roles, Role::parse),
            site_assignments: parse_table(
                tables,
                SourceTable::SiteAssignments,
                SiteAssignment::parse,
            ),
            type_role_links: parse_table(tables, SourceTable::TypeRoleLinks, TypeRoleLink::parse),
            periods: parse_table(tables, SourceTable::EvaluationPeriods, EvaluationPeriod::parse),
            plans: parse_table(tables, SourceTable::EvaluationPlans, EvaluationPlan::parse),
            evaluations: first_per_id(
                parse_table(
                    tables,
                    SourceTable::SubmittedEvaluations,
                    SubmittedEvaluation::parse,
                ),
                SourceTable::SubmittedEvaluations,
                |evaluation| evaluation.id.as_str(),
            ),
            score_definitions: parse_table(
                tables,
                SourceTable::ScoreDefinitions,
                ScoreDefinition::parse,
            ),
            criteria: parse_table(tables, SourceTable::Criteria, Criterion::parse),
            date_keys: raw_date_keys(tables),
        })
    }
}

// Score ids derive from the evaluation id, so a repeated Row ID would mint
// colliding facts.
fn first_per_id<T>(rows: Vec<T>, table: SourceTable, id: fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let first = seen.insert(id(row).to_string());
            if !first {
                warn!(
                    table = table.native_name(),
                    row_id = id(row),
                    "duplicate Row ID, keeping the first row"
                );
            }
            first
        })
        .collect()
}

fn raw_date_keys(tables: &SourceTables) -> Vec<String> {
    let evaluation_dates = tables
        .records(SourceTable::SubmittedEvaluations)
        .iter()
        .map(|record| record.text(columns::EVALUATION_DATE));
    let period_dates = tables
        .records(SourceTable::EvaluationPeriods)
        .iter()
        .map(|record| record.text(columns::PERIOD_DATE));

    evaluation_dates
        .chain(period_dates)
        .filter_map(|raw| format_date(raw.as_deref()))
        .collect()
}

fn parse_table<T>(
    tables: &SourceTables,
    table: SourceTable,
    parse: fn(&RawRecord) -> ParseResult<T>,
) -> Vec<T> {
    tables
        .records(table)
        .iter()
        .enumerate()
        .filter_map(|(position, record)| match parse(record) {
            Ok(entity) => Some(entity),
            Err(reason) => {
                warn!(
                    table = table.native_name(),
                    position,
                    row_id = ?record.id(),
                    reason,
                    "skipping unusable source row"
                );
                None
            }
        })
        .collect()
}
