//! Data points, price history, historical data series and news.

use intrinio_core::{ApiRequest, CellValue, DateInput, IntrinioError, PagePosition};

use crate::cache::QueryKey;
use crate::resolver::{normalize_range, IntrinioResolver, ItemPolicy};

/// Optional filters shared by the history endpoints.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub start_date: Option<DateInput>,
    pub end_date: Option<DateInput>,
    pub frequency: Option<String>,
    /// Historical data only, sent as `type`.
    pub period_type: Option<String>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_date(mut self, date: impl Into<DateInput>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn end_date(mut self, date: impl Into<DateInput>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    pub fn period_type(mut self, period_type: impl Into<String>) -> Self {
        self.period_type = Some(period_type.into());
        self
    }
}

impl IntrinioResolver {
    /// Latest value of a single data point, e.g. `AAPL` / `close_price`.
    pub async fn data_point(&self, identifier: &str, item: &str) -> CellValue {
        let id = identifier.trim().to_uppercase();
        let key = QueryKey::builder().part(&id).part(item).build();
        if let Some(value) = self.caches.data_points.get(&key) {
            tracing::debug!("Cache hit for data point {}", key);
            return CellValue::from_json(&value).coerce_numeric();
        }

        let request = ApiRequest::new("/data_point")
            .param("identifier", &id)
            .param("item", item);
        let response = match self.api.get(&request).await {
            Ok(response) => response,
            Err(e) => return e.into(),
        };
        let Some(value) = response.get("value").cloned() else {
            return IntrinioError::Status(response.status_code).into();
        };
        self.caches.data_points.put(key, value.clone());
        self.data_fetched().await;
        CellValue::from_json(&value).coerce_numeric()
    }

    /// One column of the daily/weekly/... price history, newest first.
    pub async fn historical_prices(
        &self,
        identifier: &str,
        item: &str,
        sequence: u32,
        filter: &HistoryFilter,
    ) -> CellValue {
        let (start, end) =
            match normalize_range(filter.start_date.as_ref(), filter.end_date.as_ref()) {
                Ok(range) => range,
                Err(e) => return e.into(),
            };
        let id = identifier.trim().to_uppercase();
        let pos = PagePosition::of(sequence);
        let frequency = filter.frequency.as_deref();

        let key = QueryKey::builder()
            .part(&id)
            .opt(start.as_deref())
            .opt(end.as_deref())
            .opt(frequency)
            .page(pos.page_number);
        let request = ApiRequest::new("/prices")
            .param("identifier", &id)
            .opt_param("start_date", start.as_deref())
            .opt_param("end_date", end.as_deref())
            .opt_param("frequency", frequency)
            .page(pos.page_number);

        self.resolve_item(
            "historical prices",
            &self.caches.prices,
            key,
            request,
            pos.offset,
            item,
            ItemPolicy::PRICES,
        )
        .await
    }

    /// Historical series of one data tag. `show_date` returns the date of
    /// the observation instead of its value.
    pub async fn historical_data(
        &self,
        identifier: &str,
        item: &str,
        sequence: u32,
        filter: &HistoryFilter,
        show_date: bool,
    ) -> CellValue {
        let (start, end) =
            match normalize_range(filter.start_date.as_ref(), filter.end_date.as_ref()) {
                Ok(range) => range,
                Err(e) => return e.into(),
            };
        let id = identifier.trim().to_uppercase();
        let pos = PagePosition::of(sequence);
        let frequency = filter.frequency.as_deref();
        let period_type = filter.period_type.as_deref();

        let key = QueryKey::builder()
            .part(&id)
            .part(item)
            .opt(start.as_deref())
            .opt(end.as_deref())
            .opt(frequency)
            .opt(period_type)
            .page(pos.page_number);
        let request = ApiRequest::new("/historical_data")
            .param("identifier", &id)
            .param("item", item)
            .opt_param("start_date", start.as_deref())
            .opt_param("end_date", end.as_deref())
            .opt_param("frequency", frequency)
            .opt_param("type", period_type)
            .page(pos.page_number);

        let column = if show_date { "date" } else { "value" };
        self.resolve_item(
            "historical data",
            &self.caches.historical_data,
            key,
            request,
            pos.offset,
            column,
            ItemPolicy::HISTORICAL_DATA,
        )
        .await
    }

    /// One field of one news article for the identifier.
    pub async fn news(&self, identifier: &str, item: &str, sequence: u32) -> CellValue {
        let id = identifier.trim().to_uppercase();
        let pos = PagePosition::of(sequence);
        let key = QueryKey::builder().part(&id).page(pos.page_number);
        let request = ApiRequest::new("/news")
            .param("identifier", &id)
            .page(pos.page_number);

        self.resolve_item(
            "news",
            &self.caches.news,
            key,
            request,
            pos.offset,
            item,
            ItemPolicy::NEWS,
        )
        .await
    }
}
