use super::domain::{SiteAssignment, TypeRoleLink};
use super::index::ReferenceIndex;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Who works where, and who may evaluate which provider type.
#[derive(Debug, Default)]
pub struct AssignmentResolver<'a> {
    site_users: HashMap<&'a str, BTreeSet<&'a str>>,
    type_users: HashMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> AssignmentResolver<'a> {
    pub fn build(
        assignments: &'a [SiteAssignment],
        links: &'a [TypeRoleLink],
        index: &ReferenceIndex<'a>,
    ) -> Self {
        let mut site_users: HashMap<&'a str, BTreeSet<&'a str>> = HashMap::new();
        for assignment in assignments {
            site_users
                .entry(assignment.work_site_id.as_str())
                .or_default()
                .insert(assignment.user_id.as_str());
        }

        let mut type_users: HashMap<&'a str, BTreeSet<&'a str>> = HashMap::new();
        for link in links {
            let Some(role) = index.role(&link.role_id) else {
                warn!(
                    provider_type = %link.provider_type_id,
                    role = %link.role_id,
                    "type/role link references an unknown role"
                );
                continue;
            };
            type_users
                .entry(link.provider_type_id.as_str())
                .or_default()
                .extend(role.related_user_ids.iter().map(String::as_str));
        }

        Self {
            site_users,
            type_users,
        }
    }

    pub fn site_users(&self, work_site_id: &str) -> Option<&BTreeSet<&'a str>> {
        self.site_users.get(work_site_id)
    }

    pub fn type_users(&self, provider_type_id: &str) -> Option<&BTreeSet<&'a str>> {
        self.type_users.get(provider_type_id)
    }

    /// Users assigned to the site who are also authorized for the provider type.
    pub fn authorized_users(&self, work_site_id: &str, provider_type_id: &str) -> BTreeSet<&'a str> {
        match (
            self.site_users(work_site_id),
            self.type_users(provider_type_id),
        ) {
            (Some(site), Some(authorized)) => site.intersection(authorized).copied().collect(),
            _ => BTreeSet::new(),
        }
    }
}
