use super::assignment::AssignmentResolver;
use super::domain::{EvaluationPeriod, EvaluationPlan, Provider, SourceModel, SubmittedEvaluation};
use super::identity::{FactKind, IdentityAssigner};
use super::index::ReferenceIndex;
use super::rows::ObligationFact;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Natural key of an obligation row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObligationKey {
    pub work_site_id: String,
    pub provider_id: String,
    pub period_id: String,
    pub user_id: String,
}

impl ObligationKey {
    pub fn new(work_site_id: &str, provider_id: &str, period_id: &str, user_id: &str) -> Self {
        Self {
            work_site_id: work_site_id.to_string(),
            provider_id: provider_id.to_string(),
            period_id: period_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn for_evaluation(evaluation: &SubmittedEvaluation) -> Self {
        Self::new(
            &evaluation.work_site_id,
            &evaluation.provider_id,
            &evaluation.period_id,
            &evaluation.evaluator_id,
        )
    }

    fn natural_key(&self) -> [&str; 4] {
        [
            &self.work_site_id,
            &self.provider_id,
            &self.period_id,
            &self.user_id,
        ]
    }
}

/// Evaluators that actually submitted, grouped by (site, provider, period).
#[derive(Debug, Default)]
pub struct SubmissionIndex<'a> {
    evaluators: HashMap<(&'a str, &'a str, &'a str), HashSet<&'a str>>,
}

impl<'a> SubmissionIndex<'a> {
    pub fn build(evaluations: &'a [SubmittedEvaluation]) -> Self {
        let mut evaluators: HashMap<_, HashSet<&'a str>> = HashMap::new();
        for evaluation in evaluations {
            evaluators
                .entry((
                    evaluation.work_site_id.as_str(),
                    evaluation.provider_id.as_str(),
                    evaluation.period_id.as_str(),
                ))
                .or_default()
                .insert(evaluation.evaluator_id.as_str());
        }
        Self { evaluators }
    }

    pub fn submitted(&self, key: &ObligationKey) -> bool {
        self.evaluators
            .get(&(
                key.work_site_id.as_str(),
                key.provider_id.as_str(),
                key.period_id.as_str(),
            ))
            .is_some_and(|users| users.contains(key.user_id.as_str()))
    }
}

/// Obligation rows keyed by their natural key, in emission order.
#[derive(Debug)]
pub struct ObligationLedger {
    ids: IdentityAssigner,
    facts: Vec<ObligationFact>,
    positions: HashMap<ObligationKey, usize>,
}

impl ObligationLedger {
    pub fn new(ids: IdentityAssigner) -> Self {
        Self {
            ids,
            facts: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn id_for(&self, key: &ObligationKey) -> Option<&str> {
        self.positions
            .get(key)
            .map(|&position| self.facts[position].id.as_str())
    }

    /// Records a planned obligation; returns false when the key already exists.
    fn insert_planned(&mut self, key: ObligationKey, plan_id: &str, fulfilled: bool) -> bool {
        if self.positions.contains_key(&key) {
            return false;
        }
        let fact = ObligationFact {
            id: self.ids.mint(FactKind::Obligation, &key.natural_key()),
            source_plan_id: Some(plan_id.to_string()),
            period_id: key.period_id.clone(),
            work_site_id: key.work_site_id.clone(),
            provider_id: key.provider_id.clone(),
            user_id: key.user_id.clone(),
            fulfilled,
            planned: true,
        };
        self.push(key, fact);
        true
    }

    /// Id of the obligation for `key`, minting an unplanned, fulfilled row
    /// when no plan produced one.
    pub fn resolve_or_mint(&mut self, key: &ObligationKey) -> String {
        if let Some(id) = self.id_for(key) {
            return id.to_string();
        }

        let fact = ObligationFact {
            id: self.ids.mint(FactKind::Obligation, &key.natural_key()),
            source_plan_id: None,
            period_id: key.period_id.clone(),
            work_site_id: key.work_site_id.clone(),
            provider_id: key.provider_id.clone(),
            user_id: key.user_id.clone(),
            fulfilled: true,
            planned: false,
        };
        let id = fact.id.clone();
        debug!(obligation = %id, ?key, "minted obligation for unplanned submission");
        self.push(key.clone(), fact);
        id
    }

    fn push(&mut self, key: ObligationKey, fact: ObligationFact) {
        self.positions.insert(key, self.facts.len());
        self.facts.push(fact);
    }

    pub fn facts(&self) -> &[ObligationFact] {
        &self.facts
    }

    pub fn into_facts(self) -> Vec<ObligationFact> {
        self.facts
    }
}

/// Expands every period's plans into one obligation per authorized user.
pub fn expand_obligations(
    model: &SourceModel,
    index: &ReferenceIndex<'_>,
    resolver: &AssignmentResolver<'_>,
    submissions: &SubmissionIndex<'_>,
    ids: IdentityAssigner,
) -> ObligationLedger {
    let mut ledger = ObligationLedger::new(ids);
    let mut duplicates = 0usize;

    for period in &model.periods {
        for plan_id in &period.related_plan_ids {
            let Some(plan) = index.plan(plan_id) else {
                warn!(period = %period.id, plan = %plan_id, "period references an unknown plan");
                continue;
            };
            let Some((provider, work_site_id)) = resolve_plan(plan, index) else {
                continue;
            };
            let Some(provider_type_id) = provider.provider_type_id.as_deref() else {
                debug!(provider = %provider.id, "provider has no type, nobody is obliged");
                continue;
            };
            let period_id = plan_period(plan, period);

            for user_id in resolver.authorized_users(work_site_id, provider_type_id) {
                let key = ObligationKey::new(work_site_id, &provider.id, period_id, user_id);
                let fulfilled = submissions.submitted(&key);
                if !ledger.insert_planned(key, &plan.id, fulfilled) {
                    duplicates += 1;
                }
            }
        }
    }

    info!(
        obligations = ledger.len(),
        duplicates, "expanded evaluation plans into obligations"
    );
    ledger
}

fn resolve_plan<'a>(
    plan: &'a EvaluationPlan,
    index: &ReferenceIndex<'a>,
) -> Option<(&'a Provider, &'a str)> {
    let Some(provider) = plan.provider_id.as_deref().and_then(|id| index.provider(id)) else {
        warn!(plan = %plan.id, provider = ?plan.provider_id, "plan references an unknown provider");
        return None;
    };
    let Some(work_site) = plan.work_site_id.as_deref().and_then(|id| index.work_site(id)) else {
        warn!(plan = %plan.id, work_site = ?plan.work_site_id, "plan references an unknown work site");
        return None;
    };
    Some((provider, work_site.id.as_str()))
}

// The plan's own period wins; the referencing cut only fills a gap.
fn plan_period<'a>(plan: &'a EvaluationPlan, period: &'a EvaluationPeriod) -> &'a str {
    plan.period_id.as_deref().unwrap_or(period.id.as_str())
}
