use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::key::CacheKey;

/// Invalidation scopes for cached query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheTag {
    Dashboard,
    FunnelMetrics,
    PipelineDetail,
    SgaHub,
    SgmHub,
    GcHubSync,
    FilterOptions,
}

impl CacheTag {
    pub const ALL: [CacheTag; 7] = [
        CacheTag::Dashboard,
        CacheTag::FunnelMetrics,
        CacheTag::PipelineDetail,
        CacheTag::SgaHub,
        CacheTag::SgmHub,
        CacheTag::GcHubSync,
        CacheTag::FilterOptions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTag::Dashboard => "dashboard",
            CacheTag::FunnelMetrics => "funnel-metrics",
            CacheTag::PipelineDetail => "pipeline-detail",
            CacheTag::SgaHub => "sga-hub",
            CacheTag::SgmHub => "sgm-hub",
            CacheTag::GcHubSync => "gc-hub-sync",
            CacheTag::FilterOptions => "filter-options",
        }
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("unknown cache tag '{}'", s))
    }
}

/// Generation counters of a set of tags, captured when a computation starts
pub(crate) type TagSnapshot = Vec<(CacheTag, u64)>;

/// Many-to-many index between tags and cache keys
///
/// Each tag also carries a generation that moves on every invalidation, so a
/// result computed while its tag was purged can be recognised as stale.
#[derive(Debug, Default)]
pub(crate) struct TagIndex {
    keys: HashMap<CacheTag, HashSet<CacheKey>>,
    generations: HashMap<CacheTag, u64>,
}

impl TagIndex {
    pub fn snapshot(&self, tags: &[CacheTag]) -> TagSnapshot {
        tags.iter()
            .map(|tag| (*tag, self.generations.get(tag).copied().unwrap_or(0)))
            .collect()
    }

    pub fn is_current(&self, snapshot: &TagSnapshot) -> bool {
        snapshot
            .iter()
            .all(|(tag, generation)| self.generations.get(tag).copied().unwrap_or(0) == *generation)
    }

    pub fn register(&mut self, key: &CacheKey, tags: &[CacheTag]) {
        for tag in tags {
            self.keys.entry(*tag).or_default().insert(key.clone());
        }
    }

    /// Take every key under `tag` out of the index and bump its generation
    pub fn purge(&mut self, tag: CacheTag) -> HashSet<CacheKey> {
        *self.generations.entry(tag).or_insert(0) += 1;
        let removed = self.keys.remove(&tag).unwrap_or_default();
        if !removed.is_empty() {
            for keys in self.keys.values_mut() {
                keys.retain(|key| !removed.contains(key));
            }
            self.keys.retain(|_, keys| !keys.is_empty());
        }
        removed
    }

    /// Drop keys whose entries are gone (expired or evicted)
    pub fn retain_live(&mut self, mut is_live: impl FnMut(&CacheKey) -> bool) {
        for keys in self.keys.values_mut() {
            keys.retain(|key| is_live(key));
        }
        self.keys.retain(|_, keys| !keys.is_empty());
    }

    #[cfg(test)]
    pub fn tagged_keys(&self, tag: CacheTag) -> usize {
        self.keys.get(&tag).map(HashSet::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CacheKey {
        CacheKey::from_parts(name, b"{}")
    }

    #[test]
    fn tag_names_round_trip() {
        for tag in CacheTag::ALL {
            assert_eq!(tag.as_str().parse::<CacheTag>(), Ok(tag));
            assert_eq!(serde_json::to_value(tag).unwrap(), serde_json::json!(tag.as_str()));
        }
        assert!("funnel_metrics".parse::<CacheTag>().is_err());
    }

    #[test]
    fn purge_removes_key_from_every_tag() {
        let mut index = TagIndex::default();
        index.register(&key("a"), &[CacheTag::Dashboard, CacheTag::FunnelMetrics]);
        index.register(&key("b"), &[CacheTag::FunnelMetrics]);

        let removed = index.purge(CacheTag::Dashboard);
        assert_eq!(removed.len(), 1);
        assert_eq!(index.tagged_keys(CacheTag::FunnelMetrics), 1);
        assert!(index.purge(CacheTag::Dashboard).is_empty());
    }

    #[test]
    fn snapshot_goes_stale_after_purge() {
        let mut index = TagIndex::default();
        let snapshot = index.snapshot(&[CacheTag::GcHubSync, CacheTag::Dashboard]);
        assert!(index.is_current(&snapshot));

        index.purge(CacheTag::SgaHub);
        assert!(index.is_current(&snapshot));

        index.purge(CacheTag::GcHubSync);
        assert!(!index.is_current(&snapshot));
    }
}
