//! Filed fundamentals and the tag listings of each statement, in both the
//! standardized and the as-reported flavour.

use intrinio_core::{ApiRequest, CellValue, PagePosition};

use crate::cache::{PageKeyCache, QueryKey};
use crate::resolver::{IntrinioResolver, ItemPolicy};

/// Years below this are sequence numbers into the fundamentals listing.
pub(crate) const FIRST_FISCAL_YEAR: i32 = 1900;

/// A concrete fiscal year/period pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FiscalPeriod {
    pub year: String,
    pub period: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavour {
    Standardized,
    Reported,
}

impl Flavour {
    fn policy(self) -> ItemPolicy {
        match self {
            Flavour::Standardized => ItemPolicy::STANDARDIZED,
            Flavour::Reported => ItemPolicy::REPORTED,
        }
    }
}

impl IntrinioResolver {
    fn fundamentals_query(
        &self,
        flavour: Flavour,
        id: &str,
        statement: &str,
        period_type: Option<&str>,
        page_number: u32,
    ) -> (&'static str, &PageKeyCache, QueryKey, ApiRequest) {
        let (kind, cache, path) = match flavour {
            Flavour::Standardized => (
                "fundamentals",
                &self.caches.fundamentals,
                "/fundamentals/standardized",
            ),
            Flavour::Reported => (
                "reported fundamentals",
                &self.caches.reported_fundamentals,
                "/fundamentals/reported",
            ),
        };
        let key = QueryKey::builder()
            .part(id)
            .part(statement)
            .opt(period_type)
            .page(page_number);
        let request = ApiRequest::new(path)
            .param("identifier", id)
            .param("statement", statement)
            .opt_param("type", period_type)
            .page(page_number);
        (kind, cache, key, request)
    }

    async fn fundamentals_item(
        &self,
        flavour: Flavour,
        identifier: &str,
        statement: &str,
        period_type: Option<&str>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        let id = identifier.trim().to_uppercase();
        let pos = PagePosition::of(sequence);
        let (kind, cache, key, request) =
            self.fundamentals_query(flavour, &id, statement, period_type, pos.page_number);
        self.resolve_item(kind, cache, key, request, pos.offset, item, flavour.policy())
            .await
    }

    /// One field (e.g. `fiscal_year`, `end_date`) of the n-th standardized
    /// filing of a statement.
    pub async fn fundamentals(
        &self,
        identifier: &str,
        statement: &str,
        period_type: Option<&str>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        self.fundamentals_item(
            Flavour::Standardized,
            identifier,
            statement,
            period_type,
            sequence,
            item,
        )
        .await
    }

    /// As-reported counterpart of [`IntrinioResolver::fundamentals`].
    pub async fn reported_fundamentals(
        &self,
        identifier: &str,
        statement: &str,
        period_type: Option<&str>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        self.fundamentals_item(
            Flavour::Reported,
            identifier,
            statement,
            period_type,
            sequence,
            item,
        )
        .await
    }

    /// One field of the n-th standardized tag of a statement.
    pub async fn tags(
        &self,
        identifier: &str,
        statement: &str,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        let id = identifier.trim().to_uppercase();
        let pos = PagePosition::of(sequence);
        let key = QueryKey::builder()
            .part(&id)
            .part(statement)
            .page(pos.page_number);
        let request = ApiRequest::new("/tags/standardized")
            .param("identifier", &id)
            .param("statement", statement)
            .page(pos.page_number);

        self.resolve_item(
            "tags",
            &self.caches.tags,
            key,
            request,
            pos.offset,
            item,
            ItemPolicy::STANDARDIZED,
        )
        .await
    }

    /// One field of the n-th XBRL tag reported in a filing. A fiscal year
    /// below 1900 selects the filing by sequence, see
    /// [`IntrinioResolver::financials`].
    pub async fn reported_tags(
        &self,
        identifier: &str,
        statement: &str,
        fiscal_year: i32,
        fiscal_period: &str,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        let id = identifier.trim().to_uppercase();
        let fiscal = match self
            .resolve_fiscal_period(Flavour::Reported, &id, statement, fiscal_year, fiscal_period)
            .await
        {
            Ok(fiscal) => fiscal,
            Err(cell) => return cell,
        };

        let pos = PagePosition::of(sequence);
        let key = QueryKey::builder()
            .part(&id)
            .part(statement)
            .part(&fiscal.year)
            .part(&fiscal.period)
            .page(pos.page_number);
        let request = ApiRequest::new("/tags/reported")
            .param("identifier", &id)
            .param("statement", statement)
            .param("fiscal_year", &fiscal.year)
            .param("fiscal_period", &fiscal.period)
            .page(pos.page_number);

        let value = self
            .resolve_item(
                "reported tags",
                &self.caches.reported_tags,
                key,
                request,
                pos.offset,
                item,
                ItemPolicy::REPORTED,
            )
            .await;
        if item == "domain_tag" && value.is_empty() {
            return CellValue::text("");
        }
        value
    }

    /// Turn a (fiscal_year, fiscal_period) argument pair into a concrete
    /// filing period.
    ///
    /// Years from 1900 on are taken literally. Smaller values are a sequence
    /// into the fundamentals listing with `fiscal_period` as its period-type
    /// filter; the filing found there supplies the year and period. When that
    /// lookup does not produce both, its result is handed back as `Err` for
    /// the caller to return as-is.
    pub(crate) async fn resolve_fiscal_period(
        &self,
        flavour: Flavour,
        id: &str,
        statement: &str,
        fiscal_year: i32,
        fiscal_period: &str,
    ) -> Result<FiscalPeriod, CellValue> {
        if fiscal_year >= FIRST_FISCAL_YEAR {
            return Ok(FiscalPeriod {
                year: fiscal_year.to_string(),
                period: fiscal_period.to_string(),
            });
        }

        let policy = flavour.policy();
        let Ok(sequence) = u32::try_from(fiscal_year) else {
            return Err(CellValue::text(policy.out_of_range));
        };
        let period_type = Some(fiscal_period.trim()).filter(|p| !p.is_empty());
        let pos = PagePosition::of(sequence);
        let (kind, cache, key, request) =
            self.fundamentals_query(flavour, id, statement, period_type, pos.page_number);
        let page = self
            .cached_page(kind, cache, key, request)
            .await
            .map_err(CellValue::from)?;

        let year = match policy.extract(&page, pos.offset, "fiscal_year").coerce_numeric() {
            CellValue::Number(n) if n.fract() == 0.0 => (n as i64).to_string(),
            other => return Err(other),
        };
        let period = match policy.extract(&page, pos.offset, "fiscal_period") {
            CellValue::Text(p) if page_has(&page, pos.offset, "fiscal_period") && !p.is_empty() => p,
            other => return Err(other),
        };
        tracing::debug!(
            "{} {} sequence {} resolved to {} {}",
            id,
            statement,
            sequence,
            year,
            period
        );
        Ok(FiscalPeriod { year, period })
    }
}

fn page_has(page: &intrinio_core::Page, offset: usize, item: &str) -> bool {
    page.record(offset)
        .map(|record| record.contains_key(item))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{page_body, FakeApi};
    use serde_json::json;

    fn filings() -> serde_json::Value {
        page_body(
            vec![
                json!({"fiscal_year": 2016, "fiscal_period": "FY", "end_date": "2016-09-24"}),
                json!({"fiscal_year": 2015, "fiscal_period": "FY", "end_date": "2015-09-26"}),
            ],
            1,
        )
    }

    #[tokio::test]
    async fn test_fundamentals_items() {
        let api = FakeApi::new();
        api.on(
            "/fundamentals/standardized",
            &[("identifier", "AAPL"), ("statement", "income_statement"), ("type", "FY")],
            200,
            filings(),
        );
        let resolver = IntrinioResolver::new(api.clone());

        assert_eq!(
            resolver
                .fundamentals("AAPL", "income_statement", Some("FY"), 1, "end_date")
                .await,
            CellValue::text("2015-09-26")
        );
        assert_eq!(
            resolver
                .fundamentals("AAPL", "income_statement", Some("FY"), 0, "nope")
                .await,
            CellValue::text("Invalid item: nope")
        );
        assert_eq!(
            resolver
                .fundamentals("AAPL", "income_statement", Some("FY"), 7, "end_date")
                .await,
            CellValue::text("Sequence out of range")
        );
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_reported_fundamentals_use_na() {
        let api = FakeApi::new();
        api.on("/fundamentals/reported", &[], 200, filings());
        let resolver = IntrinioResolver::new(api.clone());

        assert_eq!(
            resolver
                .reported_fundamentals("AAPL", "balance_sheet", None, 0, "nope")
                .await,
            CellValue::na()
        );
    }

    #[tokio::test]
    async fn test_tags_and_statement_namespaces() {
        let api = FakeApi::new();
        api.on(
            "/tags/standardized",
            &[("statement", "income_statement")],
            200,
            page_body(vec![json!({"name": "Total Revenue", "tag": "totalrevenue"})], 1),
        );
        api.on(
            "/tags/standardized",
            &[("statement", "balance_sheet")],
            200,
            page_body(vec![json!({"name": "Total Assets", "tag": "totalassets"})], 1),
        );
        let resolver = IntrinioResolver::new(api.clone());

        assert_eq!(
            resolver.tags("AAPL", "income_statement", 0, "tag").await,
            CellValue::text("totalrevenue")
        );
        assert_eq!(
            resolver.tags("AAPL", "balance_sheet", 0, "tag").await,
            CellValue::text("totalassets")
        );
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_reported_tags_resolve_sequence_year() {
        let api = FakeApi::new();
        api.on("/fundamentals/reported", &[("type", "FY")], 200, filings());
        api.on(
            "/tags/reported",
            &[("fiscal_year", "2015"), ("fiscal_period", "FY")],
            200,
            page_body(
                vec![
                    json!({"xbrl_tag": "Revenues", "domain_tag": null}),
                    json!({"xbrl_tag": "Revenues", "domain_tag": "ProductMember"}),
                ],
                1,
            ),
        );
        let resolver = IntrinioResolver::new(api.clone());

        assert_eq!(
            resolver
                .reported_tags("AAPL", "income_statement", 1, "FY", 0, "xbrl_tag")
                .await,
            CellValue::text("Revenues")
        );
        assert_eq!(
            resolver
                .reported_tags("AAPL", "income_statement", 1, "FY", 0, "domain_tag")
                .await,
            CellValue::text("")
        );
        assert_eq!(
            resolver
                .reported_tags("AAPL", "income_statement", 2015, "FY", 1, "domain_tag")
                .await,
            CellValue::text("ProductMember")
        );
        assert_eq!(api.calls_to("/fundamentals/reported"), 1);
        assert_eq!(api.calls_to("/tags/reported"), 1);
    }

    #[tokio::test]
    async fn test_fiscal_sequence_past_end_is_returned_as_is() {
        let api = FakeApi::new();
        api.on("/fundamentals/standardized", &[], 200, filings());
        let resolver = IntrinioResolver::new(api.clone());

        let resolved = resolver
            .resolve_fiscal_period(Flavour::Standardized, "AAPL", "income_statement", 9, "FY")
            .await;
        assert_eq!(resolved, Err(CellValue::text("Sequence out of range")));

        let resolved = resolver
            .resolve_fiscal_period(Flavour::Standardized, "AAPL", "income_statement", 0, "FY")
            .await;
        assert_eq!(
            resolved,
            Ok(FiscalPeriod {
                year: "2016".to_string(),
                period: "FY".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_literal_fiscal_year_skips_lookup() {
        let api = FakeApi::new();
        let resolver = IntrinioResolver::new(api.clone());

        let resolved = resolver
            .resolve_fiscal_period(Flavour::Reported, "AAPL", "income_statement", 2014, "Q2")
            .await;
        assert_eq!(resolved.unwrap().year, "2014");
        assert_eq!(api.calls(), 0);
    }
}
