use super::domain::{
    Criterion, EvaluationPlan, Provider, Role, ScoreDefinition, SourceModel, WorkSite,
};
use std::collections::HashMap;

/// Read-only lookups over the parsed source model.
///
/// Duplicate ids resolve to the last row seen, like the upstream export.
#[derive(Debug, Default)]
pub struct ReferenceIndex<'a> {
    providers: HashMap<&'a str, &'a Provider>,
    roles: HashMap<&'a str, &'a Role>,
    work_sites: HashMap<&'a str, &'a WorkSite>,
    plans: HashMap<&'a str, &'a EvaluationPlan>,
    score_definitions: HashMap<&'a str, &'a ScoreDefinition>,
    criteria: HashMap<&'a str, &'a Criterion>,
    max_points: HashMap<&'a str, HashMap<&'a str, f64>>,
}

impl<'a> ReferenceIndex<'a> {
    pub fn build(model: &'a SourceModel) -> Self {
        Self {
            providers: by_id(&model.providers, |p| &p.id),
            roles: by_id(&model.roles, |r| &r.id),
            work_sites: by_id(&model.work_sites, |w| &w.id),
            plans: by_id(&model.plans, |p| &p.id),
            score_definitions: by_id(&model.score_definitions, |s| &s.id),
            criteria: by_id(&model.criteria, |c| &c.id),
            max_points: max_points_table(&model.score_definitions),
        }
    }

    pub fn provider(&self, id: &str) -> Option<&'a Provider> {
        self.providers.get(id).copied()
    }

    pub fn role(&self, id: &str) -> Option<&'a Role> {
        self.roles.get(id).copied()
    }

    pub fn work_site(&self, id: &str) -> Option<&'a WorkSite> {
        self.work_sites.get(id).copied()
    }

    pub fn plan(&self, id: &str) -> Option<&'a EvaluationPlan> {
        self.plans.get(id).copied()
    }

    pub fn score_definition(&self, id: &str) -> Option<&'a ScoreDefinition> {
        self.score_definitions.get(id).copied()
    }

    pub fn criterion(&self, id: &str) -> Option<&'a Criterion> {
        self.criteria.get(id).copied()
    }

    /// Highest points attainable for a criterion under a provider type.
    pub fn max_points(&self, provider_type_id: &str, criterion_id: &str) -> Option<f64> {
        self.max_points
            .get(provider_type_id)
            .and_then(|criteria| criteria.get(criterion_id))
            .copied()
    }
}

fn by_id<'a, T>(items: &'a [T], id: impl Fn(&'a T) -> &'a String) -> HashMap<&'a str, &'a T> {
    items.iter().map(|item| (id(item).as_str(), item)).collect()
}

fn max_points_table(definitions: &[ScoreDefinition]) -> HashMap<&str, HashMap<&str, f64>> {
    let mut table: HashMap<&str, HashMap<&str, f64>> = HashMap::new();
    for definition in definitions {
        table
            .entry(definition.provider_type_id.as_str())
            .or_default()
            .entry(definition.criterion_id.as_str())
            .and_modify(|best| *best = best.max(definition.points))
            .or_insert(definition.points);
    }
    table
}
