use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::error::FilterError;
use super::types::{Dimension, Disposition, FilterValue};

/// The filter actually sent to the warehouse
///
/// Only built by [`merge`](super::merge), so every instance already carries
/// the caller's permission scopes. Field order, map ordering and the
/// skipped-when-absent dates make the serialized form canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) end_date: Option<NaiveDate>,
    pub(crate) disposition: Disposition,
    pub(crate) dimensions: BTreeMap<Dimension, FilterValue>,
}

impl EffectiveFilter {
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&FilterValue> {
        self.dimensions.get(&dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&Dimension, &FilterValue)> {
        self.dimensions.iter()
    }

    /// Canonical byte encoding used for cache keys
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, FilterError> {
        Ok(serde_json::to_vec(self)?)
    }
}
