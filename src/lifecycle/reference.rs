//! Reference numbers
//!
//! Human-facing identifiers like `APT-2025-0526-001`: a prefix, the local
//! calendar date and a per-collection sequence padded to three digits.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};

use super::local_today;
use crate::config::ReferenceStrategy;
use crate::data::{Store, child_path, collections, count_children};
use crate::error::AppError;

pub const APPOINTMENT_PREFIX: &str = "APT";
pub const BLOTTER_PREFIX: &str = "BLT";

/// `{PREFIX}-{YYYY}-{MMDD}-{SEQ}`; sequences above 999 keep growing
pub fn format_reference_number(prefix: &str, date: NaiveDate, sequence: i64) -> String {
    format!("{}-{}-{:03}", prefix, date.format("%Y-%m%d"), sequence)
}

/// Reference number generator
pub struct ReferenceNumberGenerator {
    store: Arc<dyn Store>,
    strategy: ReferenceStrategy,
    offset: FixedOffset,
}

impl ReferenceNumberGenerator {
    pub fn new(store: Arc<dyn Store>, strategy: ReferenceStrategy, offset: FixedOffset) -> Self {
        Self {
            store,
            strategy,
            offset,
        }
    }

    /// Next reference number for a record about to be created in `collection`
    pub async fn next(&self, prefix: &str, collection: &str) -> Result<String, AppError> {
        let sequence = self.next_sequence(collection).await?;
        let reference = format_reference_number(prefix, local_today(self.offset), sequence);
        tracing::debug!(collection, %reference, "Generated reference number");
        Ok(reference)
    }

    async fn next_sequence(&self, collection: &str) -> Result<i64, AppError> {
        match self.strategy {
            // Two creates that count before either writes get the same number.
            ReferenceStrategy::Count => Ok(self.existing(collection).await? + 1),
            ReferenceStrategy::Atomic => {
                let counter = child_path(collections::COUNTERS, collection);
                let seed = match self.store.get(&counter).await? {
                    Some(_) => 1,
                    None => self.existing(collection).await? + 1,
                };
                self.store.increment(&counter, seed).await
            }
        }
    }

    async fn existing(&self, collection: &str) -> Result<i64, AppError> {
        let node = self.store.get(collection).await?;
        Ok(count_children(&node) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::create_test_store;
    use serde_json::json;

    fn philippine_time() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn is_reference(value: &str, prefix: &str) -> bool {
        let parts: Vec<&str> = value.split('-').collect();
        parts.len() == 4
            && parts[0] == prefix
            && parts[1].len() == 4
            && parts[2].len() == 4
            && parts[3].len() >= 3
            && parts[1..].iter().all(|part| part.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn format_pads_sequence() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 26).unwrap();
        assert_eq!(format_reference_number("APT", date, 1), "APT-2025-0526-001");
        assert_eq!(format_reference_number("BLT", date, 42), "BLT-2025-0526-042");
        assert_eq!(format_reference_number("BLT", date, 1000), "BLT-2025-0526-1000");
    }

    #[tokio::test]
    async fn count_strategy_uses_collection_size() {
        let (store, _temp_dir) = create_test_store().await;
        for id in ["a", "b", "c", "d", "e"] {
            store.set(&format!("appointments/{}", id), json!({ "id": id })).await.unwrap();
        }

        let generator =
            ReferenceNumberGenerator::new(store, ReferenceStrategy::Count, philippine_time());
        let reference = generator.next(APPOINTMENT_PREFIX, "appointments").await.unwrap();

        assert!(is_reference(&reference, "APT"));
        assert!(reference.ends_with("-006"));
        let today = local_today(philippine_time());
        assert!(reference.starts_with(&format!("APT-{}", today.format("%Y-%m%d"))));
    }

    #[tokio::test]
    async fn count_strategy_repeats_until_a_record_is_written() {
        let (store, _temp_dir) = create_test_store().await;
        for id in ["a", "b", "c", "d", "e"] {
            store.set(&format!("blotter/{}", id), json!({ "id": id })).await.unwrap();
        }

        let generator =
            ReferenceNumberGenerator::new(store, ReferenceStrategy::Count, philippine_time());
        let first = generator.next(BLOTTER_PREFIX, "blotter").await.unwrap();
        let second = generator.next(BLOTTER_PREFIX, "blotter").await.unwrap();

        assert_eq!(first, second);
        assert!(first.ends_with("-006"));
    }

    #[tokio::test]
    async fn atomic_strategy_seeds_from_existing_records() {
        let (store, _temp_dir) = create_test_store().await;
        for id in ["a", "b", "c", "d", "e"] {
            store.set(&format!("blotter/{}", id), json!({ "id": id })).await.unwrap();
        }

        let generator =
            ReferenceNumberGenerator::new(store, ReferenceStrategy::Atomic, philippine_time());
        let first = generator.next(BLOTTER_PREFIX, "blotter").await.unwrap();
        let second = generator.next(BLOTTER_PREFIX, "blotter").await.unwrap();

        assert!(first.ends_with("-006"));
        assert!(second.ends_with("-007"));
    }

    #[tokio::test]
    async fn atomic_strategy_never_shares_a_sequence() {
        let (store, _temp_dir) = create_test_store().await;
        let generator = Arc::new(ReferenceNumberGenerator::new(
            store,
            ReferenceStrategy::Atomic,
            philippine_time(),
        ));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let generator = generator.clone();
            handles.push(tokio::spawn(async move {
                generator.next(APPOINTMENT_PREFIX, "appointments").await.unwrap()
            }));
        }

        let mut references = std::collections::HashSet::new();
        for handle in handles {
            assert!(references.insert(handle.await.unwrap()));
        }
        assert_eq!(references.len(), 10);
    }
}
