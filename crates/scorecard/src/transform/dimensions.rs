use super::domain::SourceModel;
use super::rows::{
    CriterionRow, EvaluationPeriodRow, ProviderRow, ProviderTypeRow, RoleRow, UserRow, WorkSiteRow,
};

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

pub fn criteria(model: &SourceModel) -> Vec<CriterionRow> {
    model
        .criteria
        .iter()
        .map(|criterion| CriterionRow {
            id: criterion.id.clone(),
            name: or_empty(&criterion.name),
        })
        .collect()
}

pub fn work_sites(model: &SourceModel) -> Vec<WorkSiteRow> {
    model
        .work_sites
        .iter()
        .map(|site| WorkSiteRow {
            id: site.id.clone(),
            name: or_empty(&site.name),
        })
        .collect()
}

pub fn provider_types(model: &SourceModel) -> Vec<ProviderTypeRow> {
    model
        .provider_types
        .iter()
        .map(|provider_type| ProviderTypeRow {
            id: provider_type.id.clone(),
            name: or_empty(&provider_type.name),
        })
        .collect()
}

pub fn providers(model: &SourceModel) -> Vec<ProviderRow> {
    model
        .providers
        .iter()
        .map(|provider| ProviderRow {
            id: provider.id.clone(),
            name: or_empty(&provider.name),
            provider_type_id: or_empty(&provider.provider_type_id),
        })
        .collect()
}

pub fn roles(model: &SourceModel) -> Vec<RoleRow> {
    model
        .roles
        .iter()
        .map(|role| RoleRow {
            id: role.id.clone(),
            name: or_empty(&role.name),
        })
        .collect()
}

pub fn users(model: &SourceModel) -> Vec<UserRow> {
    model
        .users
        .iter()
        .map(|user| UserRow {
            id: user.id.clone(),
            name: or_empty(&user.name),
            role_id: or_empty(&user.role_id),
        })
        .collect()
}

pub fn evaluation_periods(model: &SourceModel) -> Vec<EvaluationPeriodRow> {
    model
        .periods
        .iter()
        .map(|period| EvaluationPeriodRow {
            id: period.id.clone(),
            date_key: period.date_key.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::domain::{Provider, User};

    #[test]
    fn missing_names_and_keys_become_empty() {
        let model = SourceModel {
            providers: vec![Provider {
                id: "p1".to_string(),
                name: None,
                provider_type_id: Some("t1".to_string()),
            }],
            users: vec![User {
                id: "u1".to_string(),
                name: Some("Ana".to_string()),
                role_id: None,
            }],
            ..SourceModel::default()
        };

        assert_eq!(
            providers(&model),
            vec![ProviderRow {
                id: "p1".to_string(),
                name: String::new(),
                provider_type_id: "t1".to_string(),
            }]
        );
        assert_eq!(
            users(&model),
            vec![UserRow {
                id: "u1".to_string(),
                name: "Ana".to_string(),
                role_id: String::new(),
            }]
        );
    }
}
