use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::FilterError;

/// Filterable dimensions of the funnel data
///
/// Closed so that a misspelled dimension is rejected at the boundary instead
/// of silently becoming an unused filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Sga,
    Sgm,
    Channel,
    Source,
    Stage,
    Territory,
    Campaign,
    ExperimentationTag,
}

impl Dimension {
    pub const ALL: [Dimension; 8] = [
        Dimension::Sga,
        Dimension::Sgm,
        Dimension::Channel,
        Dimension::Source,
        Dimension::Stage,
        Dimension::Territory,
        Dimension::Campaign,
        Dimension::ExperimentationTag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Sga => "sga",
            Dimension::Sgm => "sgm",
            Dimension::Channel => "channel",
            Dimension::Source => "source",
            Dimension::Stage => "stage",
            Dimension::Territory => "territory",
            Dimension::Campaign => "campaign",
            Dimension::ExperimentationTag => "experimentation_tag",
        }
    }

    /// Warehouse column the dimension filters on
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Sga => "sga_owner_name",
            Dimension::Sgm => "sgm_owner_name",
            Dimension::Channel => "channel_grouping_name",
            Dimension::Source => "original_source",
            Dimension::Stage => "stage_name",
            Dimension::Territory => "territory",
            Dimension::Campaign => "campaign_name",
            Dimension::ExperimentationTag => "experimentation_tag",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opportunity disposition toggle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    #[default]
    All,
    Open,
    Lost,
    Converted,
}

/// Raw caller input for one dimension: a scalar or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterInput {
    One(String),
    Many(Vec<String>),
}

/// Normalized filter value
///
/// Values are trimmed, lists are deduplicated and ordered, and a list of one
/// collapses to a scalar, so equivalent inputs encode identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Any(BTreeSet<String>),
}

impl FilterValue {
    /// Normalize caller input. Returns `None` when the input carries no
    /// constraint (blank scalar, empty list).
    pub fn from_input(input: &FilterInput) -> Option<Self> {
        let value = Self::normalize(input);
        match &value {
            FilterValue::Any(set) if set.is_empty() => None,
            _ => Some(value),
        }
    }

    /// Normalize a permission scope. An empty list is kept: it scopes the
    /// holder to nothing rather than lifting the scope.
    pub fn from_scope(input: &FilterInput) -> Self {
        Self::normalize(input)
    }

    fn normalize(input: &FilterInput) -> Self {
        let values: BTreeSet<String> = match input {
            FilterInput::One(v) => std::iter::once(v.trim().to_string()).collect(),
            FilterInput::Many(vs) => vs.iter().map(|v| v.trim().to_string()).collect(),
        };
        let mut values: BTreeSet<String> = values.into_iter().filter(|v| !v.is_empty()).collect();

        if values.len() == 1 {
            if let Some(only) = values.pop_first() {
                return FilterValue::One(only);
            }
        }
        FilterValue::Any(values)
    }

    /// Values as a list, for binding
    pub fn values(&self) -> Vec<String> {
        match self {
            FilterValue::One(v) => vec![v.clone()],
            FilterValue::Any(set) => set.iter().cloned().collect(),
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        match self {
            FilterValue::One(v) => v == candidate,
            FilterValue::Any(set) => set.contains(candidate),
        }
    }
}

/// Filters supplied by the dashboard caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFilters {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub disposition: Option<Disposition>,
    #[serde(default)]
    pub dimensions: BTreeMap<Dimension, Option<FilterInput>>,
}

impl DashboardFilters {
    pub fn validate(&self) -> Result<(), FilterError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(FilterError::InvalidDateRange { start, end });
            }
        }
        Ok(())
    }

    /// Builder helper, mostly for tests and the CLI
    pub fn with_dimension(mut self, dimension: Dimension, input: FilterInput) -> Self {
        self.dimensions.insert(dimension, Some(input));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_element_list_collapses_to_scalar() {
        let value = FilterValue::from_input(&FilterInput::Many(vec![" west ".to_string()]));
        assert_eq!(value, Some(FilterValue::One("west".to_string())));
    }

    #[test]
    fn lists_are_deduplicated_and_ordered() {
        let a = FilterValue::from_input(&FilterInput::Many(vec!["b".into(), "a".into(), "b".into()]));
        let b = FilterValue::from_input(&FilterInput::Many(vec!["a".into(), "b".into()]));
        assert_eq!(a, b);
    }

    #[test]
    fn blank_caller_input_is_no_constraint() {
        assert_eq!(FilterValue::from_input(&FilterInput::One("  ".into())), None);
        assert_eq!(FilterValue::from_input(&FilterInput::Many(vec![])), None);
    }

    #[test]
    fn empty_scope_is_kept() {
        let scope = FilterValue::from_scope(&FilterInput::Many(vec![]));
        assert_eq!(scope, FilterValue::Any(BTreeSet::new()));
        assert!(!scope.contains("anyone"));
    }

    #[test]
    fn dashboard_filters_deserialize_from_camel_case() {
        let json = serde_json::json!({
            "startDate": "2025-01-01",
            "endDate": "2025-03-31",
            "disposition": "open",
            "dimensions": { "sga": "east", "stage": ["SQL", "SQO"], "channel": null }
        });
        let filters: DashboardFilters = serde_json::from_value(json).unwrap();
        assert_eq!(filters.disposition, Some(Disposition::Open));
        assert_eq!(filters.dimensions.len(), 3);
        assert_eq!(filters.dimensions[&Dimension::Channel], None);
        assert!(filters.validate().is_ok());
    }

    #[test]
    fn unknown_dimension_is_rejected() {
        let json = serde_json::json!({ "dimensions": { "region_typo": "x" } });
        assert!(serde_json::from_value::<DashboardFilters>(json).is_err());
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let filters = DashboardFilters {
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        };
        assert!(matches!(filters.validate(), Err(FilterError::InvalidDateRange { .. })));
    }
}
