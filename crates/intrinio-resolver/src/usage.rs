use intrinio_core::Record;
use tokio::sync::RwLock;

/// Process-wide copy of the account's API usage statistics.
///
/// Cleared after every successful data fetch and refetched lazily on the
/// next read.
#[derive(Default)]
pub struct UsageSnapshot {
    data: RwLock<Option<Record>>,
}

impl UsageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Record> {
        self.data.read().await.clone()
    }

    pub async fn is_present(&self) -> bool {
        self.data.read().await.is_some()
    }

    pub async fn set(&self, data: Record) {
        *self.data.write().await = Some(data);
    }

    pub async fn clear(&self) {
        *self.data.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_clear() {
        let usage = UsageSnapshot::new();
        assert!(!usage.is_present().await);

        let mut record = Record::new();
        record.insert("calls_made".into(), json!(12));
        usage.set(record).await;
        assert_eq!(usage.get().await.unwrap()["calls_made"], json!(12));

        usage.clear().await;
        assert!(usage.get().await.is_none());
    }
}
