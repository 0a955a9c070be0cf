//! # Anchor Search
//!
//! Filtered listing of active anchors, newest first. Hits on batch tables
//! carry a snapshot of the referenced batch when one can be loaded.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{BatchSnapshot, DomainStore};
use crate::error::AnchorError;
use crate::store::{AnchorFilter, AnchorRecord, AnchorStore};

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

/// Map a requested limit onto `1..=MAX_LIMIT`. Non-positive means default.
pub fn clamp_limit(requested: i64) -> usize {
    if requested <= 0 {
        DEFAULT_LIMIT
    } else {
        usize::try_from(requested).map_or(MAX_LIMIT, |n| n.min(MAX_LIMIT))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub anchor: AnchorRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub count: usize,
    pub limit: usize,
}

#[derive(Clone)]
pub struct AnchorSearch {
    anchors: Arc<dyn AnchorStore>,
    domain: Arc<dyn DomainStore>,
}

impl AnchorSearch {
    pub fn new(anchors: Arc<dyn AnchorStore>, domain: Arc<dyn DomainStore>) -> Self {
        Self { anchors, domain }
    }

    pub async fn search(&self, filter: &AnchorFilter, limit: i64) -> Result<SearchResults, AnchorError> {
        filter.validate()?;
        let limit = clamp_limit(limit);
        let anchors = self.anchors.search_anchors(filter, limit).await?;

        // One lookup per distinct batch.
        let mut snapshots: HashMap<i64, Option<BatchSnapshot>> = HashMap::new();
        let mut hits = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            let batch = if anchor.related_table.is_summarizable() {
                if !snapshots.contains_key(&anchor.related_id) {
                    let snapshot = self.snapshot(anchor.related_id).await;
                    snapshots.insert(anchor.related_id, snapshot);
                }
                snapshots.get(&anchor.related_id).cloned().flatten()
            } else {
                None
            };
            hits.push(SearchHit { anchor, batch });
        }

        Ok(SearchResults {
            count: hits.len(),
            hits,
            limit,
        })
    }

    async fn snapshot(&self, batch_id: i64) -> Option<BatchSnapshot> {
        match self.domain.batch(batch_id).await {
            Ok(batch) => batch.map(|b| b.snapshot()),
            Err(e) => {
                tracing::warn!(batch_id, error = %e, "batch snapshot lookup failed during search");
                None
            }
        }
    }
}
