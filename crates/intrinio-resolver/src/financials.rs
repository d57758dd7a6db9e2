//! Financial statement values looked up by tag.
//!
//! The API only lists a statement page by page, so a tag lookup scans the
//! whole listing once, caches every tag it passes, and remembers that the
//! query was exhausted. Later misses for the same query answer `na` without
//! another scan.

use intrinio_core::{ApiRequest, CellValue, IntrinioError};
use serde_json::Value;

use crate::cache::{KeyedCache, QueryKey};
use crate::fundamentals::{FiscalPeriod, Flavour};
use crate::resolver::IntrinioResolver;

/// Shape of one tag listing endpoint.
#[derive(Debug, Clone, Copy)]
struct TagListing {
    kind: &'static str,
    path: &'static str,
    flavour: Flavour,
    tag_field: &'static str,
    domain_field: Option<&'static str>,
}

const STANDARDIZED: TagListing = TagListing {
    kind: "financials",
    path: "/financials/standardized",
    flavour: Flavour::Standardized,
    tag_field: "tag",
    domain_field: None,
};

const REPORTED: TagListing = TagListing {
    kind: "reported financials",
    path: "/financials/reported",
    flavour: Flavour::Reported,
    tag_field: "xbrl_tag",
    domain_field: Some("domain_tag"),
};

/// One statement of one filing.
struct StatementQuery<'a> {
    id: &'a str,
    statement: &'a str,
    fiscal: FiscalPeriod,
}

impl StatementQuery<'_> {
    fn query_key(&self) -> QueryKey {
        QueryKey::builder()
            .part(self.id)
            .part(self.statement)
            .part(&self.fiscal.year)
            .part(&self.fiscal.period)
            .build()
    }

    fn tag_key(&self, tag: &str, domain: Option<&str>) -> QueryKey {
        QueryKey::builder()
            .part(self.id)
            .part(self.statement)
            .part(&self.fiscal.year)
            .part(&self.fiscal.period)
            .part(tag)
            .opt(domain)
            .build()
    }

    fn request(&self, listing: TagListing, page_number: u32) -> ApiRequest {
        ApiRequest::new(listing.path)
            .param("identifier", self.id)
            .param("statement", self.statement)
            .param("fiscal_year", &self.fiscal.year)
            .param("fiscal_period", &self.fiscal.period)
            .page(page_number)
    }
}

/// Abstract tags are headings without values.
fn is_valueless_tag(tag: &str) -> bool {
    tag.is_empty() || tag.to_lowercase().ends_with("abstract")
}

impl IntrinioResolver {
    /// Value of a standardized tag (e.g. `totalrevenue`) in one statement.
    ///
    /// A fiscal year below 1900 is a sequence into the fundamentals listing,
    /// with `fiscal_period` as its period type (`FY`, `QTR`, `TTM`, `YTD`).
    pub async fn financials(
        &self,
        identifier: &str,
        statement: &str,
        fiscal_year: i32,
        fiscal_period: &str,
        tag: &str,
    ) -> CellValue {
        self.lookup_tag(
            STANDARDIZED,
            &self.caches.financials,
            &self.caches.financials_queries,
            identifier,
            statement,
            fiscal_year,
            fiscal_period,
            tag,
            None,
        )
        .await
    }

    /// Value of an XBRL tag, optionally qualified by its domain tag, in one
    /// as-reported statement.
    pub async fn reported_financials(
        &self,
        identifier: &str,
        statement: &str,
        fiscal_year: i32,
        fiscal_period: &str,
        xbrl_tag: &str,
        domain_tag: Option<&str>,
    ) -> CellValue {
        self.lookup_tag(
            REPORTED,
            &self.caches.reported_financials,
            &self.caches.reported_financials_queries,
            identifier,
            statement,
            fiscal_year,
            fiscal_period,
            xbrl_tag,
            domain_tag,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn lookup_tag(
        &self,
        listing: TagListing,
        tags: &KeyedCache<CellValue>,
        exhausted: &KeyedCache<bool>,
        identifier: &str,
        statement: &str,
        fiscal_year: i32,
        fiscal_period: &str,
        tag: &str,
        domain_tag: Option<&str>,
    ) -> CellValue {
        let tag = tag.trim();
        if is_valueless_tag(tag) {
            return CellValue::text("");
        }
        let domain_tag = domain_tag.map(str::trim).filter(|d| !d.is_empty());

        let id = identifier.trim().to_uppercase();
        let fiscal = match self
            .resolve_fiscal_period(listing.flavour, &id, statement, fiscal_year, fiscal_period)
            .await
        {
            Ok(fiscal) => fiscal,
            Err(cell) => return cell,
        };
        let query = StatementQuery {
            id: &id,
            statement,
            fiscal,
        };

        let tag_key = query.tag_key(tag, domain_tag);
        if let Some(value) = tags.get(&tag_key) {
            tracing::debug!("Cache hit for {} {}", listing.kind, tag_key);
            return value;
        }
        let query_key = query.query_key();
        if exhausted.is_cached(&query_key) {
            tracing::debug!("{} {} already scanned, {} not present", listing.kind, query_key, tag);
            return CellValue::na();
        }

        match self.scan(listing, tags, &query, tag, domain_tag).await {
            Ok(found) => {
                exhausted.put(query_key, true);
                found.unwrap_or_else(|| {
                    tags.put(tag_key, CellValue::na());
                    CellValue::na()
                })
            }
            Err(e) => e.into(),
        }
    }

    /// Walk every page of the listing, caching each tag on the way.
    async fn scan(
        &self,
        listing: TagListing,
        tags: &KeyedCache<CellValue>,
        query: &StatementQuery<'_>,
        tag: &str,
        domain_tag: Option<&str>,
    ) -> Result<Option<CellValue>, IntrinioError> {
        let mut found = None;
        let mut total_pages = 1;
        let mut page_number = 1;

        while page_number <= total_pages {
            let response = self.api.get(&query.request(listing, page_number)).await?;
            let page = response.into_page()?;
            self.data_fetched().await;
            total_pages = page
                .total_pages
                .ok_or(IntrinioError::Status(page.status_code))?;

            for record in &page.data {
                let Some(record_tag) = record.get(listing.tag_field).and_then(Value::as_str) else {
                    continue;
                };
                let record_domain = listing
                    .domain_field
                    .and_then(|field| record.get(field))
                    .and_then(Value::as_str)
                    .filter(|d| !d.is_empty());
                let value = record
                    .get("value")
                    .map(CellValue::from_json)
                    .unwrap_or(CellValue::Empty);

                if record_tag == tag && record_domain == domain_tag {
                    found = Some(value.clone());
                }
                tags.put(query.tag_key(record_tag, record_domain), value);
            }
            page_number += 1;
        }

        tracing::debug!(
            "Scanned {} pages of {} {}",
            total_pages,
            listing.kind,
            query.query_key()
        );
        Ok(found)
    }
}
