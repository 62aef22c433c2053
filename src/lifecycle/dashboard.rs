//! Staff dashboard counts

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::data::{Store, collections};
use crate::error::AppError;
use crate::metrics::RECORDS_TOTAL;

/// Record total and per-status breakdown for one collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl StatusCounts {
    /// Count the children of a collection node by the string at `pointer`
    fn tally(node: Option<Value>, pointer: &str) -> Self {
        let Some(Value::Object(children)) = node else {
            return Self::default();
        };

        let mut counts = Self {
            total: children.len(),
            by_status: BTreeMap::new(),
        };
        for record in children.values() {
            let status = record
                .pointer(pointer)
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            *counts.by_status.entry(status.to_string()).or_default() += 1;
        }
        counts
    }

    pub fn get(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub certificates: StatusCounts,
    pub appointments: StatusCounts,
    pub blotter: StatusCounts,
    pub residents: StatusCounts,
}

pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Read the four collections concurrently and summarise them
    pub async fn stats(&self) -> Result<DashboardStats, AppError> {
        let (certificates, appointments, blotter, residents) = tokio::join!(
            self.store.get(collections::CERTIFICATES),
            self.store.get(collections::APPOINTMENTS),
            self.store.get(collections::BLOTTER),
            self.store.get(collections::RESIDENTS),
        );

        let stats = DashboardStats {
            certificates: StatusCounts::tally(certificates?, "/status"),
            appointments: StatusCounts::tally(appointments?, "/status"),
            blotter: StatusCounts::tally(blotter?, "/status"),
            residents: StatusCounts::tally(residents?, "/verification/status"),
        };

        for (collection, counts) in [
            (collections::CERTIFICATES, &stats.certificates),
            (collections::APPOINTMENTS, &stats.appointments),
            (collections::BLOTTER, &stats.blotter),
            (collections::RESIDENTS, &stats.residents),
        ] {
            RECORDS_TOTAL
                .with_label_values(&[collection])
                .set(counts.total as i64);
        }

        Ok(stats)
    }
}
