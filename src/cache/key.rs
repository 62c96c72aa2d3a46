use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::filters::{EffectiveFilter, FilterError};

/// Cache key for a query result
///
/// The query name plus a SHA-256 digest of the effective filter's canonical
/// encoding. Two requests with the same scope and the same filters collide on
/// the same key; anything else does not.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    query: Arc<str>,
    digest: [u8; 32],
}

impl CacheKey {
    pub fn derive(query: &str, filter: &EffectiveFilter) -> Result<Self, FilterError> {
        let bytes = filter.canonical_bytes()?;
        Ok(Self::from_parts(query, &bytes))
    }

    pub(crate) fn from_parts(query: &str, encoded_filter: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        hasher.update([0u8]);
        hasher.update(encoded_filter);
        Self {
            query: Arc::from(query),
            digest: hasher.finalize().into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.query)?;
        for byte in &self.digest[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
