use intrinio_core::{
    normalize_date, ApiRequest, CellValue, DateInput, IntrinioApi, IntrinioError, IntrinioResult,
    Page, Record,
};
use serde_json::Value;
use std::sync::Arc;

use crate::cache::{KeyedCache, PageKeyCache, QueryKey};
use crate::identifier::IdentifierValidator;
use crate::usage::UsageSnapshot;

/// How a missing item is reported for one data kind.
#[derive(Debug, Clone, Copy)]
pub(crate) enum InvalidItem {
    Fixed(&'static str),
    /// `Invalid item: <name>`
    Named,
}

/// Per-kind extraction contract. The wording is matched on by callers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ItemPolicy {
    pub invalid_item: InvalidItem,
    pub out_of_range: &'static str,
    pub coerce_numeric: bool,
}

impl ItemPolicy {
    pub const PRICES: ItemPolicy = ItemPolicy {
        invalid_item: InvalidItem::Fixed("Invalid item"),
        out_of_range: "Sequence out of range",
        coerce_numeric: true,
    };
    pub const HISTORICAL_DATA: ItemPolicy = ItemPolicy {
        invalid_item: InvalidItem::Fixed("na"),
        out_of_range: "Sequence out of range",
        coerce_numeric: true,
    };
    pub const NEWS: ItemPolicy = ItemPolicy {
        invalid_item: InvalidItem::Fixed("Invalid item"),
        out_of_range: "Sequence out of range",
        coerce_numeric: false,
    };
    pub const STANDARDIZED: ItemPolicy = ItemPolicy {
        invalid_item: InvalidItem::Named,
        out_of_range: "Sequence out of range",
        coerce_numeric: false,
    };
    pub const REPORTED: ItemPolicy = ItemPolicy {
        invalid_item: InvalidItem::Fixed("na"),
        out_of_range: "Sequence out of range",
        coerce_numeric: false,
    };
    pub const DIRECTORY: ItemPolicy = ItemPolicy {
        invalid_item: InvalidItem::Fixed("na"),
        out_of_range: "",
        coerce_numeric: false,
    };

    /// Pull `item` out of the record at `offset`.
    pub fn extract(&self, page: &Page, offset: usize, item: &str) -> CellValue {
        let Some(record) = page.record(offset) else {
            return CellValue::text(self.out_of_range);
        };
        match record.get(item) {
            Some(value) => {
                let cell = CellValue::from_json(value);
                if self.coerce_numeric {
                    cell.coerce_numeric()
                } else {
                    cell
                }
            }
            None => match self.invalid_item {
                InvalidItem::Fixed(message) => CellValue::text(message),
                InvalidItem::Named => CellValue::text(format!("Invalid item: {}", item)),
            },
        }
    }
}

/// One cache instance per data kind; key namespaces are never shared.
#[derive(Default)]
pub(crate) struct Caches {
    pub data_points: KeyedCache<Value>,
    pub prices: PageKeyCache,
    pub historical_data: PageKeyCache,
    pub news: PageKeyCache,
    pub fundamentals: PageKeyCache,
    pub tags: PageKeyCache,
    pub reported_fundamentals: PageKeyCache,
    pub reported_tags: PageKeyCache,
    pub financials: KeyedCache<CellValue>,
    pub financials_queries: KeyedCache<bool>,
    pub reported_financials: KeyedCache<CellValue>,
    pub reported_financials_queries: KeyedCache<bool>,
    pub companies: PageKeyCache,
    pub company: KeyedCache<Arc<Record>>,
    pub securities: PageKeyCache,
    pub security: KeyedCache<Arc<Record>>,
    pub indices: PageKeyCache,
    pub index: KeyedCache<Arc<Record>>,
    pub sec_filings: PageKeyCache,
}

/// Session-scoped resolver: owns every cache and the API handle.
///
/// Create one per host session; tests create a fresh one per case.
pub struct IntrinioResolver {
    pub(crate) api: Arc<dyn IntrinioApi>,
    pub(crate) caches: Caches,
    identifiers: IdentifierValidator,
    usage: UsageSnapshot,
}

impl IntrinioResolver {
    pub fn new(api: Arc<dyn IntrinioApi>) -> Self {
        Self {
            identifiers: IdentifierValidator::new(api.clone()),
            api,
            caches: Caches::default(),
            usage: UsageSnapshot::new(),
        }
    }

    pub fn identifiers(&self) -> &IdentifierValidator {
        &self.identifiers
    }

    pub fn usage_snapshot(&self) -> &UsageSnapshot {
        &self.usage
    }

    /// Serve a page from `cache`, fetching and storing it on a miss.
    ///
    /// Only responses carrying `data` are stored, so failures are retried by
    /// the next call.
    pub(crate) async fn cached_page(
        &self,
        kind: &str,
        cache: &PageKeyCache,
        key: QueryKey,
        request: ApiRequest,
    ) -> IntrinioResult<Arc<Page>> {
        self.fetch_page(kind, cache, key, request, true).await
    }

    /// Like [`cached_page`](Self::cached_page) for queries that do not count
    /// against the account, so usage statistics stay valid.
    pub(crate) async fn cached_free_page(
        &self,
        kind: &str,
        cache: &PageKeyCache,
        key: QueryKey,
        request: ApiRequest,
    ) -> IntrinioResult<Arc<Page>> {
        self.fetch_page(kind, cache, key, request, false).await
    }

    async fn fetch_page(
        &self,
        kind: &str,
        cache: &PageKeyCache,
        key: QueryKey,
        request: ApiRequest,
        clears_usage: bool,
    ) -> IntrinioResult<Arc<Page>> {
        if let Some(page) = cache.get(&key) {
            tracing::debug!("Cache hit for {} {}", kind, key);
            return Ok(page);
        }

        let response = self.api.get(&request).await?;
        let page = match response.into_page() {
            Ok(page) => Arc::new(page),
            Err(e) => {
                tracing::warn!("{} request {} failed: {}", kind, request.path, e);
                return Err(e);
            }
        };
        cache.put(key, page.clone());
        if clears_usage {
            self.data_fetched().await;
        }
        Ok(page)
    }

    /// Resolve one item of one record, rendering failures into the cell.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn resolve_item(
        &self,
        kind: &str,
        cache: &PageKeyCache,
        key: QueryKey,
        request: ApiRequest,
        offset: usize,
        item: &str,
        policy: ItemPolicy,
    ) -> CellValue {
        match self.cached_page(kind, cache, key, request).await {
            Ok(page) => policy.extract(&page, offset, item),
            Err(e) => e.into(),
        }
    }

    /// Usage statistics go stale after any successful data call.
    pub(crate) async fn data_fetched(&self) {
        self.usage.clear().await;
    }

    /// Current API usage statistic `key` for `access_code`.
    ///
    /// A missing key yields an empty string.
    pub async fn usage(&self, access_code: &str, key: &str) -> CellValue {
        if let Some(data) = self.usage.get().await {
            if data.get("access_code").and_then(Value::as_str) == Some(access_code) {
                tracing::debug!("Cache hit for usage data {} {}", access_code, key);
                return usage_value(&data, key);
            }
        }

        let request = ApiRequest::new("/usage/current").param("access_code", access_code);
        let response = match self.api.get(&request).await {
            Ok(response) => response,
            Err(e) => return e.into(),
        };
        if response.get("access_code").is_none() {
            return IntrinioError::Status(response.status_code).into();
        }
        let value = usage_value(&response.body, key);
        self.usage.set(response.body).await;
        value
    }

    /// Version information for the spreadsheet add-in, as served by `/excel`.
    pub async fn excel_version(&self) -> IntrinioResult<Record> {
        let response = self.api.get(&ApiRequest::new("/excel")).await?;
        if !response.is_success() {
            return Err(IntrinioError::Status(response.status_code));
        }
        Ok(response.body)
    }
}

fn usage_value(data: &Record, key: &str) -> CellValue {
    data.get(key)
        .map(CellValue::from_json)
        .unwrap_or_else(|| CellValue::text(""))
}

/// Normalize a start/end pair, logging the rejected input.
pub(crate) fn normalize_range(
    start: Option<&DateInput>,
    end: Option<&DateInput>,
) -> IntrinioResult<(Option<String>, Option<String>)> {
    let normalized = normalize_date(start).and_then(|s| Ok((s, normalize_date(end)?)));
    if let Err(e) = &normalized {
        tracing::warn!("{}", e);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use serde_json::json;

    fn page(records: Value) -> Page {
        intrinio_core::ApiResponse::from_json(200, json!({ "data": records }))
            .into_page()
            .unwrap()
    }

    #[test]
    fn test_extract_out_of_range_vs_invalid_item() {
        let page = page(json!([{"a": 1}, {"a": 2}, {"a": 3}, {"a": 4}, {"a": 5}]));
        assert_eq!(
            ItemPolicy::PRICES.extract(&page, 10, "a"),
            CellValue::text("Sequence out of range")
        );
        assert_eq!(
            ItemPolicy::PRICES.extract(&page, 2, "b"),
            CellValue::text("Invalid item")
        );
        assert_eq!(ItemPolicy::PRICES.extract(&page, 2, "a"), CellValue::Number(3.0));
    }

    #[test]
    fn test_extract_wording_per_kind() {
        let page = page(json!([{"a": "x"}]));
        assert_eq!(
            ItemPolicy::STANDARDIZED.extract(&page, 0, "zz"),
            CellValue::text("Invalid item: zz")
        );
        assert_eq!(ItemPolicy::REPORTED.extract(&page, 0, "zz"), CellValue::na());
        assert_eq!(ItemPolicy::DIRECTORY.extract(&page, 4, "a"), CellValue::text(""));
    }

    #[test]
    fn test_extract_coercion_is_per_kind() {
        let page = page(json!([{"v": "12.5"}]));
        assert_eq!(ItemPolicy::PRICES.extract(&page, 0, "v"), CellValue::Number(12.5));
        assert_eq!(ItemPolicy::NEWS.extract(&page, 0, "v"), CellValue::text("12.5"));
    }

    #[tokio::test]
    async fn test_usage_is_cached_until_data_fetch() {
        let api = FakeApi::new();
        api.on(
            "/usage/current",
            &[("access_code", "com_fin_data")],
            200,
            json!({"access_code": "com_fin_data", "current": 42, "limit": 500}),
        );
        let resolver = IntrinioResolver::new(api.clone());

        assert_eq!(resolver.usage("com_fin_data", "current").await, CellValue::Number(42.0));
        assert_eq!(resolver.usage("com_fin_data", "limit").await, CellValue::Number(500.0));
        assert_eq!(resolver.usage("com_fin_data", "missing").await, CellValue::text(""));
        assert_eq!(api.calls(), 1);

        resolver.data_fetched().await;
        resolver.usage("com_fin_data", "current").await;
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_excel_version() {
        let api = FakeApi::new();
        api.on("/excel", &[], 200, json!({"version": "2.1.4", "release_date": "2017-05-01"}));
        let resolver = IntrinioResolver::new(api.clone());

        let version = resolver.excel_version().await.unwrap();
        assert_eq!(version.get("version"), Some(&json!("2.1.4")));

        let api = FakeApi::new();
        api.on("/excel", &[], 401, json!({}));
        let resolver = IntrinioResolver::new(api);
        assert!(matches!(
            resolver.excel_version().await,
            Err(IntrinioError::Status(401))
        ));
    }

    #[tokio::test]
    async fn test_usage_failure_reports_status() {
        let api = FakeApi::new();
        api.on("/usage/current", &[], 401, json!({}));
        let resolver = IntrinioResolver::new(api.clone());

        assert_eq!(
            resolver.usage("com_fin_data", "current").await,
            CellValue::text("Your username and password keys are incorrect")
        );
        assert!(!resolver.usage_snapshot().is_present().await);
    }
}
