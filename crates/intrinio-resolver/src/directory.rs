//! Company, security and index directories plus SEC filing listings.
//!
//! Query lookups page through a listing; identifier lookups fetch a single
//! entity and cache the whole response.

use intrinio_core::{
    ApiRequest, CellValue, DateInput, IntrinioError, IntrinioResult, Page, PagePosition, Record,
};
use std::sync::Arc;

use crate::cache::{KeyedCache, QueryKey};
use crate::resolver::{normalize_range, IntrinioResolver, ItemPolicy};

/// A set of item names a caller can pass as `item`.
///
/// Each catalogue is read off a benchmark record, so it lists what the API
/// returns rather than a fixed schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Catalogue {
    /// Items of a companies query record (benchmark: query `IBM`).
    Companies,
    /// Items of a company looked up by identifier (benchmark: `IBM`).
    Company,
    /// Items of a securities query record (benchmark: query `IBM`).
    Securities,
    /// Items of a security looked up by identifier (benchmark: `IBM`).
    Security,
    /// Items of the first record of an indices query; these vary by type.
    Indices {
        query: Option<String>,
        index_type: Option<String>,
    },
    /// Items of an index looked up by identifier (benchmark: `$SPX`).
    Index,
    /// Items of a filing record (benchmark: IBM 10-Q filings of 2016).
    SecFilings,
}

/// Filters of a securities query.
#[derive(Debug, Clone, Default)]
pub struct SecuritiesFilter {
    pub query: Option<String>,
    pub exchange_symbol: Option<String>,
    pub last_crsp_adj_date: Option<DateInput>,
}

/// Filters of an SEC filings listing for one company.
#[derive(Debug, Clone, Default)]
pub struct FilingsFilter {
    pub report_type: Option<String>,
    pub start_date: Option<DateInput>,
    pub end_date: Option<DateInput>,
}

fn result_count(page: &Page) -> CellValue {
    match page.result_count {
        Some(count) => CellValue::Number(count as f64),
        None => IntrinioError::Status(page.status_code).into(),
    }
}

impl IntrinioResolver {
    async fn companies_page(
        &self,
        query: Option<&str>,
        latest_filing_date: Option<&DateInput>,
        page_number: u32,
    ) -> IntrinioResult<Arc<Page>> {
        let (latest_filing_date, _) = normalize_range(latest_filing_date, None)?;
        let key = QueryKey::builder()
            .opt(query)
            .opt(latest_filing_date.as_deref())
            .page(page_number);
        let request = ApiRequest::new("/companies")
            .opt_param("query", query)
            .opt_param("latest_filing_date", latest_filing_date.as_deref())
            .page(page_number);
        self.cached_free_page("companies", &self.caches.companies, key, request)
            .await
    }

    async fn securities_page(
        &self,
        filter: &SecuritiesFilter,
        page_number: u32,
    ) -> IntrinioResult<Arc<Page>> {
        let (adj_date, _) = normalize_range(filter.last_crsp_adj_date.as_ref(), None)?;
        let query = filter.query.as_deref();
        let exchange_symbol = filter.exchange_symbol.as_deref();
        let key = QueryKey::builder()
            .opt(query)
            .opt(exchange_symbol)
            .opt(adj_date.as_deref())
            .page(page_number);
        let request = ApiRequest::new("/securities")
            .opt_param("query", query)
            .opt_param("exch_symbol", exchange_symbol)
            .opt_param("last_crsp_adj_date", adj_date.as_deref())
            .page(page_number);
        self.cached_free_page("securities", &self.caches.securities, key, request)
            .await
    }

    async fn indices_page(
        &self,
        query: Option<&str>,
        index_type: Option<&str>,
        page_number: u32,
    ) -> IntrinioResult<Arc<Page>> {
        let key = QueryKey::builder()
            .opt(query)
            .opt(index_type)
            .page(page_number);
        let request = ApiRequest::new("/indices")
            .opt_param("query", query)
            .opt_param("type", index_type)
            .page(page_number);
        self.cached_free_page("indices", &self.caches.indices, key, request)
            .await
    }

    async fn sec_filings_page(
        &self,
        identifier: &str,
        filter: &FilingsFilter,
        page_number: u32,
    ) -> IntrinioResult<Arc<Page>> {
        let (start, end) = normalize_range(filter.start_date.as_ref(), filter.end_date.as_ref())?;
        let id = identifier.trim().to_uppercase();
        let report_type = filter.report_type.as_deref();
        let key = QueryKey::builder()
            .part(&id)
            .opt(report_type)
            .opt(start.as_deref())
            .opt(end.as_deref())
            .page(page_number);
        let request = ApiRequest::new("/companies/filings")
            .param("identifier", &id)
            .opt_param("report_type", report_type)
            .opt_param("start_date", start.as_deref())
            .opt_param("end_date", end.as_deref())
            .page(page_number);
        self.cached_free_page("sec filings", &self.caches.sec_filings, key, request)
            .await
    }

    /// Fetch one entity by identifier. Only successful responses are kept.
    async fn entity(
        &self,
        kind: &str,
        cache: &KeyedCache<Arc<Record>>,
        path: &str,
        identifier: &str,
    ) -> IntrinioResult<Arc<Record>> {
        let id = identifier.trim().to_uppercase();
        let key = QueryKey::builder().part(&id).build();
        if let Some(record) = cache.get(&key) {
            tracing::debug!("Cache hit for {} {}", kind, key);
            return Ok(record);
        }

        let response = self.api.get(&ApiRequest::new(path).param("identifier", &id)).await?;
        if !response.is_success() || response.body.is_empty() {
            tracing::warn!("{} lookup of {} failed with {}", kind, id, response.status_code);
            return Err(IntrinioError::Status(response.status_code));
        }
        let record = Arc::new(response.body);
        cache.put(key, record.clone());
        Ok(record)
    }

    fn entity_item(result: IntrinioResult<Arc<Record>>, item: &str) -> CellValue {
        match result {
            Ok(record) => record
                .get(item)
                .map(CellValue::from_json)
                .unwrap_or_else(CellValue::na),
            Err(e) => e.into(),
        }
    }

    fn page_item(result: IntrinioResult<Arc<Page>>, offset: usize, item: &str) -> CellValue {
        match result {
            Ok(page) => ItemPolicy::DIRECTORY.extract(&page, offset, item),
            Err(e) => e.into(),
        }
    }

    /// One item of the n-th company matching a free-text query.
    pub async fn companies(
        &self,
        query: Option<&str>,
        latest_filing_date: Option<&DateInput>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        let pos = PagePosition::of(sequence);
        let page = self
            .companies_page(query, latest_filing_date, pos.page_number)
            .await;
        Self::page_item(page, pos.offset, item)
    }

    /// Number of companies matching a query.
    pub async fn companies_count(
        &self,
        query: Option<&str>,
        latest_filing_date: Option<&DateInput>,
    ) -> CellValue {
        match self.companies_page(query, latest_filing_date, 1).await {
            Ok(page) => result_count(&page),
            Err(e) => e.into(),
        }
    }

    /// One item of a company looked up by ticker, CIK or LEI.
    pub async fn company(&self, identifier: &str, item: &str) -> CellValue {
        let record = self
            .entity("company", &self.caches.company, "/companies", identifier)
            .await;
        Self::entity_item(record, item)
    }

    pub async fn securities(
        &self,
        filter: &SecuritiesFilter,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        let pos = PagePosition::of(sequence);
        let page = self.securities_page(filter, pos.page_number).await;
        Self::page_item(page, pos.offset, item)
    }

    pub async fn securities_count(&self, filter: &SecuritiesFilter) -> CellValue {
        match self.securities_page(filter, 1).await {
            Ok(page) => result_count(&page),
            Err(e) => e.into(),
        }
    }

    /// One item of a security looked up by ticker or FIGI.
    pub async fn security(&self, identifier: &str, item: &str) -> CellValue {
        let record = self
            .entity("security", &self.caches.security, "/securities", identifier)
            .await;
        Self::entity_item(record, item)
    }

    /// One item of the n-th index matching a query and index type
    /// (`stock_market`, `economic` or `sic`).
    pub async fn indices(
        &self,
        query: Option<&str>,
        index_type: Option<&str>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        let pos = PagePosition::of(sequence);
        let page = self.indices_page(query, index_type, pos.page_number).await;
        Self::page_item(page, pos.offset, item)
    }

    pub async fn indices_count(&self, query: Option<&str>, index_type: Option<&str>) -> CellValue {
        match self.indices_page(query, index_type, 1).await {
            Ok(page) => result_count(&page),
            Err(e) => e.into(),
        }
    }

    pub async fn index(&self, identifier: &str, item: &str) -> CellValue {
        let record = self
            .entity("index", &self.caches.index, "/indices", identifier)
            .await;
        Self::entity_item(record, item)
    }

    /// One item of the n-th SEC filing of a company, newest first.
    pub async fn sec_filings(
        &self,
        identifier: &str,
        filter: &FilingsFilter,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        let pos = PagePosition::of(sequence);
        let page = self
            .sec_filings_page(identifier, filter, pos.page_number)
            .await;
        Self::page_item(page, pos.offset, item)
    }

    pub async fn sec_filings_count(&self, identifier: &str, filter: &FilingsFilter) -> CellValue {
        match self.sec_filings_page(identifier, filter, 1).await {
            Ok(page) => result_count(&page),
            Err(e) => e.into(),
        }
    }

    /// Item names available for a catalogue, in name order.
    pub async fn catalogue_items(&self, catalogue: &Catalogue) -> IntrinioResult<Vec<String>> {
        let first_record = |page: Arc<Page>| -> Vec<String> {
            page.record(0)
                .map(|record| record.keys().cloned().collect())
                .unwrap_or_default()
        };
        let entity_keys = |record: Arc<Record>| -> Vec<String> {
            record
                .keys()
                .filter(|key| key.as_str() != "status_code")
                .cloned()
                .collect()
        };

        let mut items = match catalogue {
            Catalogue::Companies => first_record(self.companies_page(Some("IBM"), None, 1).await?),
            Catalogue::Company => entity_keys(
                self.entity("company", &self.caches.company, "/companies", "IBM")
                    .await?,
            ),
            Catalogue::Securities => {
                let filter = SecuritiesFilter {
                    query: Some("IBM".to_string()),
                    ..Default::default()
                };
                first_record(self.securities_page(&filter, 1).await?)
            }
            Catalogue::Security => entity_keys(
                self.entity("security", &self.caches.security, "/securities", "IBM")
                    .await?,
            ),
            Catalogue::Indices { query, index_type } => first_record(
                self.indices_page(query.as_deref(), index_type.as_deref(), 1)
                    .await?,
            ),
            Catalogue::Index => entity_keys(
                self.entity("index", &self.caches.index, "/indices", "$SPX")
                    .await?,
            ),
            Catalogue::SecFilings => {
                let filter = FilingsFilter {
                    report_type: Some("10-Q".to_string()),
                    start_date: Some("2016-01-01".into()),
                    end_date: Some("2017-01-01".into()),
                };
                first_record(self.sec_filings_page("IBM", &filter, 1).await?)
            }
        };
        items.sort();
        Ok(items)
    }

    /// How many items a catalogue lists.
    pub async fn catalogue_count(&self, catalogue: &Catalogue) -> CellValue {
        match self.catalogue_items(catalogue).await {
            Ok(items) => CellValue::Number(items.len() as f64),
            Err(e) => e.into(),
        }
    }

    /// The n-th item name of a catalogue; empty past the end.
    pub async fn catalogue_item(&self, catalogue: &Catalogue, sequence: u32) -> CellValue {
        match self.catalogue_items(catalogue).await {
            Ok(items) => items
                .into_iter()
                .nth(sequence as usize)
                .map(CellValue::Text)
                .unwrap_or_else(|| CellValue::text("")),
            Err(e) => e.into(),
        }
    }
}
