//! Full-snapshot transform from upstream records to the star schema.
//!
//! The run is synchronous and pure: raw tables are parsed once into typed
//! entities, indexed, and then projected into dimension rows while the two
//! fact tables are derived from plans and submissions.

pub mod assignment;
pub mod dates;
pub mod dimensions;
pub mod domain;
pub mod identity;
pub mod index;
pub mod obligations;
pub mod rows;
pub mod scores;

use crate::source::SourceTables;
use assignment::AssignmentResolver;
use domain::SourceModel;
use identity::IdentityAssigner;
use index::ReferenceIndex;
use obligations::SubmissionIndex;
use rows::{
    CriterionRow, DateRow, EvaluationPeriodRow, ObligationFact, ProviderRow, ProviderTypeRow,
    RoleRow, ScoreFact, UserRow, WorkSiteRow,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("mandatory source table '{table}' is missing")]
    MissingInput { table: &'static str },
}

/// Output tables, dimensions first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarehouseTable {
    DimCriterion,
    DimWorkSite,
    DimDate,
    DimProviderType,
    DimProvider,
    DimRole,
    DimUser,
    DimEvaluationPeriod,
    FactObligation,
    FactScore,
}

impl WarehouseTable {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::DimCriterion,
            Self::DimWorkSite,
            Self::DimDate,
            Self::DimProviderType,
            Self::DimProvider,
            Self::DimRole,
            Self::DimUser,
            Self::DimEvaluationPeriod,
            Self::FactObligation,
            Self::FactScore,
        ]
    }

    pub const fn table_name(self) -> &'static str {
        match self {
            Self::DimCriterion => "dim_criterion",
            Self::DimWorkSite => "dim_work_site",
            Self::DimDate => "dim_date",
            Self::DimProviderType => "dim_provider_type",
            Self::DimProvider => "dim_provider",
            Self::DimRole => "dim_role",
            Self::DimUser => "dim_user",
            Self::DimEvaluationPeriod => "dim_evaluation_period",
            Self::FactObligation => "fact_obligation",
            Self::FactScore => "fact_score",
        }
    }
}

/// Every row collection produced by one transform run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarehouseBundle {
    pub dim_criterion: Vec<CriterionRow>,
    pub dim_work_site: Vec<WorkSiteRow>,
    pub dim_date: Vec<DateRow>,
    pub dim_provider_type: Vec<ProviderTypeRow>,
    pub dim_provider: Vec<ProviderRow>,
    pub dim_role: Vec<RoleRow>,
    pub dim_user: Vec<UserRow>,
    pub dim_evaluation_period: Vec<EvaluationPeriodRow>,
    pub fact_obligation: Vec<ObligationFact>,
    pub fact_score: Vec<ScoreFact>,
}

impl WarehouseBundle {
    pub fn row_count(&self, table: WarehouseTable) -> usize {
        match table {
            WarehouseTable::DimCriterion => self.dim_criterion.len(),
            WarehouseTable::DimWorkSite => self.dim_work_site.len(),
            WarehouseTable::DimDate => self.dim_date.len(),
            WarehouseTable::DimProviderType => self.dim_provider_type.len(),
            WarehouseTable::DimProvider => self.dim_provider.len(),
            WarehouseTable::DimRole => self.dim_role.len(),
            WarehouseTable::DimUser => self.dim_user.len(),
            WarehouseTable::DimEvaluationPeriod => self.dim_evaluation_period.len(),
            WarehouseTable::FactObligation => self.fact_obligation.len(),
            WarehouseTable::FactScore => self.fact_score.len(),
        }
    }
}

/// Runs the whole transform. Only an absent mandatory table is fatal;
/// dangling references are logged and skipped.
pub fn transform(tables: &SourceTables) -> Result<WarehouseBundle, TransformError> {
    let model = SourceModel::parse(tables)?;
    let index = ReferenceIndex::build(&model);
    let resolver = AssignmentResolver::build(&model.site_assignments, &model.type_role_links, &index);
    let submissions = SubmissionIndex::build(&model.evaluations);
    let ids = IdentityAssigner::new();

    let mut ledger = obligations::expand_obligations(&model, &index, &resolver, &submissions, ids);
    let fact_score = scores::normalize_scores(&model, &index, &mut ledger, ids);
    let fact_obligation = ledger.into_facts();

    let dim_date = dates::build_date_dimension(&model.date_keys);

    let bundle = WarehouseBundle {
        dim_criterion: dimensions::criteria(&model),
        dim_work_site: dimensions::work_sites(&model),
        dim_date,
        dim_provider_type: dimensions::provider_types(&model),
        dim_provider: dimensions::providers(&model),
        dim_role: dimensions::roles(&model),
        dim_user: dimensions::users(&model),
        dim_evaluation_period: dimensions::evaluation_periods(&model),
        fact_obligation,
        fact_score,
    };

    info!(
        obligations = bundle.fact_obligation.len(),
        scores = bundle.fact_score.len(),
        dates = bundle.dim_date.len(),
        "transform complete"
    );
    Ok(bundle)
}
