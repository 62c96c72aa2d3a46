use std::collections::BTreeMap;

use super::effective::EffectiveFilter;
use super::types::{DashboardFilters, FilterValue};
use crate::permissions::Permissions;

/// Apply a caller's permission scopes to their dashboard filters
///
/// Each dimension is resolved on its own. A scope held in `permissions`
/// replaces whatever the caller sent for that dimension; it is not
/// intersected with it. Dimensions without a scope pass through normalized,
/// and a dimension neither side constrains is left out entirely.
pub fn merge(filters: &DashboardFilters, permissions: &Permissions) -> EffectiveFilter {
    let mut dimensions: BTreeMap<_, FilterValue> = filters
        .dimensions
        .iter()
        .filter_map(|(dimension, input)| {
            let value = input.as_ref().and_then(FilterValue::from_input)?;
            Some((*dimension, value))
        })
        .collect();

    for (dimension, scope) in permissions.scopes() {
        if let Some(requested) = dimensions.get(dimension) {
            if requested != scope {
                tracing::debug!(
                    "Overriding requested {} filter {:?} with permission scope for {}",
                    dimension,
                    requested,
                    permissions.email()
                );
            }
        }
        dimensions.insert(*dimension, scope.clone());
    }

    EffectiveFilter {
        start_date: filters.start_date,
        end_date: filters.end_date,
        disposition: filters.disposition.unwrap_or_default(),
        dimensions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionClaims;
    use crate::filters::{Dimension, Disposition, FilterInput};
    use crate::permissions::resolve;

    fn claims(role: &str, sga: Option<FilterInput>) -> SessionClaims {
        SessionClaims::new("rep@example.com", role).with_sga_filter(sga)
    }

    #[test]
    fn permission_scope_overrides_caller_value() {
        let perms = resolve(&claims("sga", Some(FilterInput::One("west".into())))).unwrap();
        let filters = DashboardFilters::default().with_dimension(Dimension::Sga, FilterInput::One("east".into()));

        let effective = merge(&filters, &perms);
        assert_eq!(effective.dimension(Dimension::Sga), Some(&FilterValue::One("west".into())));
    }

    #[test]
    fn scope_is_not_intersected_with_a_caller_subset() {
        let scope = FilterInput::Many(vec!["west".into(), "north".into()]);
        let perms = resolve(&claims("sga", Some(scope.clone()))).unwrap();
        let filters = DashboardFilters::default().with_dimension(Dimension::Sga, FilterInput::One("west".into()));

        let effective = merge(&filters, &perms);
        assert_eq!(effective.dimension(Dimension::Sga), Some(&FilterValue::from_scope(&scope)));
    }

    #[test]
    fn unscoped_dimensions_pass_through() {
        let perms = resolve(&claims("admin", None)).unwrap();
        let filters = DashboardFilters::default()
            .with_dimension(Dimension::Stage, FilterInput::Many(vec!["SQO".into(), "SQL".into()]));

        let effective = merge(&filters, &perms);
        assert_eq!(
            effective.dimension(Dimension::Stage).map(FilterValue::values),
            Some(vec!["SQL".to_string(), "SQO".to_string()])
        );
        assert_eq!(effective.dimension(Dimension::Sga), None);
    }

    #[test]
    fn omitted_and_blank_dimensions_encode_identically() {
        let perms = resolve(&claims("admin", None)).unwrap();
        let omitted = DashboardFilters::default();
        let mut blank = DashboardFilters {
            disposition: Some(Disposition::All),
            ..Default::default()
        };
        blank.dimensions.insert(Dimension::Channel, None);
        blank.dimensions.insert(Dimension::Source, Some(FilterInput::One("".into())));
        blank.dimensions.insert(Dimension::Stage, Some(FilterInput::Many(vec![])));

        let a = merge(&omitted, &perms).canonical_bytes().unwrap();
        let b = merge(&blank, &perms).canonical_bytes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn merge_is_deterministic() {
        let perms = resolve(&claims("sga", Some(FilterInput::Many(vec!["b".into(), "a".into()])))).unwrap();
        let filters = DashboardFilters::default()
            .with_dimension(Dimension::Territory, FilterInput::Many(vec!["z".into(), "y".into()]))
            .with_dimension(Dimension::Channel, FilterInput::One("Outbound".into()));

        let first = merge(&filters, &perms).canonical_bytes().unwrap();
        let second = merge(&filters, &resolve(&claims("sga", Some(FilterInput::Many(vec!["a".into(), "b".into()])))).unwrap())
            .canonical_bytes()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_scope_is_never_widened() {
        let perms = resolve(&claims("sga", Some(FilterInput::Many(vec![])))).unwrap();
        let filters = DashboardFilters::default().with_dimension(Dimension::Sga, FilterInput::One("east".into()));

        let effective = merge(&filters, &perms);
        let scoped = effective.dimension(Dimension::Sga).unwrap();
        assert!(!scoped.contains("east"));
        assert!(scoped.values().is_empty());
    }
}
