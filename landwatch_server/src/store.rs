// THEORY:
// The store is the only shared state of the service. It keeps finished analyses in
// memory, keyed by result id, with an explicit bound: once full, the oldest record
// is evicted. Records are immutable once written. An incoming record whose id is
// already present gets a freshly minted id instead, so a finished analysis is never
// lost and no stored record is ever overwritten.

use chrono::{DateTime, Utc};
use landwatch::AnalysisResult;
use landwatch::core_modules::aggregator::Summary;
use landwatch::core_modules::recommendations::Recommendation;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Where an analysis came from and when it ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMetadata {
    pub reference_filename: Option<String>,
    pub current_filename: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    /// Original upload sizes, before alignment, as `"{w}x{h}"`.
    pub reference_dimensions: String,
    pub current_dimensions: String,
}

/// A stored analysis: the result, its metadata and the derived action list.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAnalysis {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub metadata: AnalysisMetadata,
    pub recommendations: Vec<Recommendation>,
}

impl StoredAnalysis {
    pub fn new(result: AnalysisResult, metadata: AnalysisMetadata) -> Self {
        let recommendations = result.recommendations();
        Self {
            result,
            metadata,
            recommendations,
        }
    }

    pub fn id(&self) -> &str {
        &self.result.result_id
    }

    pub fn listing(&self) -> AnalysisListing {
        AnalysisListing {
            result_id: self.result.result_id.clone(),
            analyzed_at: self.metadata.analyzed_at,
            summary: self.result.summary.clone(),
            reference_file: self.metadata.reference_filename.clone(),
            current_file: self.metadata.current_filename.clone(),
        }
    }
}

/// One line of `GET /api/analyses`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisListing {
    pub result_id: String,
    pub analyzed_at: DateTime<Utc>,
    pub summary: Summary,
    pub reference_file: Option<String>,
    pub current_file: Option<String>,
}

#[derive(Debug, Default)]
struct StoreInner {
    order: VecDeque<String>,
    records: HashMap<String, Arc<StoredAnalysis>>,
}

#[derive(Debug)]
pub struct ResultStore {
    capacity: usize,
    inner: RwLock<StoreInner>,
}

impl ResultStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(StoreInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts a record, evicting the oldest ones past capacity. While the record's id
    /// is taken, `mint` supplies a new one.
    pub async fn insert(
        &self,
        mut record: StoredAnalysis,
        mut mint: impl FnMut() -> String,
    ) -> Arc<StoredAnalysis> {
        let mut inner = self.inner.write().await;
        while inner.records.contains_key(record.id()) {
            let fresh = mint();
            warn!(taken = record.id(), fresh = %fresh, "result id collision, re-minting");
            record.result.result_id = fresh;
        }
        let id = record.id().to_string();

        while inner.order.len() >= self.capacity {
            match inner.order.pop_front() {
                Some(evicted) => {
                    inner.records.remove(&evicted);
                    debug!(id = %evicted, "evicted oldest analysis");
                }
                None => break,
            }
        }

        let record = Arc::new(record);
        inner.order.push_back(id.clone());
        inner.records.insert(id, Arc::clone(&record));
        record
    }

    pub async fn get(&self, id: &str) -> Option<Arc<StoredAnalysis>> {
        self.inner.read().await.records.get(id).cloned()
    }

    /// Listings in insertion order, oldest first.
    pub async fn list(&self) -> Vec<AnalysisListing> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .map(|record| record.listing())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use landwatch::ChangeDetectionPipeline;
    use landwatch::core_modules::aggregator::mint_result_id;

    fn record(id: &str) -> StoredAnalysis {
        let image = RgbImage::from_pixel(16, 16, Rgb([40, 40, 40]));
        let mut result = ChangeDetectionPipeline::default()
            .analyze(image.clone(), image)
            .unwrap();
        result.result_id = id.to_string();
        StoredAnalysis::new(
            result,
            AnalysisMetadata {
                reference_filename: Some("ref.png".to_string()),
                current_filename: Some("cur.png".to_string()),
                analyzed_at: Utc::now(),
                reference_dimensions: "16x16".to_string(),
                current_dimensions: "16x16".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn stores_and_fetches_by_id() {
        let store = ResultStore::new(4);
        store.insert(record("AAAA0001"), mint_result_id).await;
        let fetched = store.get("AAAA0001").await.unwrap();
        assert_eq!(fetched.id(), "AAAA0001");
        assert_eq!(fetched.recommendations.len(), 1);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn colliding_id_is_reminted_and_both_records_kept() {
        let store = ResultStore::new(4);
        store.insert(record("AAAA0001"), mint_result_id).await;
        store.insert(record("AAAA0002"), mint_result_id).await;

        let mut fresh = ["AAAA0002", "AAAA0003"].into_iter().map(str::to_string);
        let stored = store
            .insert(record("AAAA0001"), || fresh.next().unwrap_or_default())
            .await;

        assert_eq!(stored.id(), "AAAA0003");
        assert_eq!(store.len().await, 3);
        let ids: Vec<String> = store.list().await.into_iter().map(|l| l.result_id).collect();
        assert_eq!(ids, vec!["AAAA0001", "AAAA0002", "AAAA0003"]);
        let original = store.get("AAAA0001").await.unwrap();
        assert_eq!(original.metadata.reference_filename.as_deref(), Some("ref.png"));
    }

    #[tokio::test]
    async fn oldest_record_is_evicted_when_full() {
        let store = ResultStore::new(2);
        for id in ["A", "B", "C"] {
            store.insert(record(id), mint_result_id).await;
        }
        assert!(store.get("A").await.is_none());
        let ids: Vec<String> = store.list().await.into_iter().map(|l| l.result_id).collect();
        assert_eq!(ids, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn zero_capacity_still_holds_one() {
        let store = ResultStore::new(0);
        assert_eq!(store.capacity(), 1);
        store.insert(record("A"), mint_result_id).await;
        store.insert(record("B"), mint_result_id).await;
        assert_eq!(store.len().await, 1);
        assert!(store.get("B").await.is_some());
    }

    #[test]
    fn stored_json_flattens_the_result() {
        let json = serde_json::to_value(record("ABCD1234")).unwrap();
        assert_eq!(json["result_id"], "ABCD1234");
        assert_eq!(json["summary"]["total_deviations"], 0);
        assert_eq!(json["metadata"]["reference_dimensions"], "16x16");
        assert_eq!(json["recommendations"][0]["priority"], "Low");
        assert!(json.get("visualizations").is_none());
    }
}
