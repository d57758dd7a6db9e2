//! The function surface a spreadsheet host calls.
//!
//! Every call returns exactly one [`CellValue`]. Before touching the API it
//! passes the configuration gate, and functions keyed by a market identifier
//! also pass the identifier validator.

use intrinio_core::{CellValue, DateInput, IntrinioError};

use crate::directory::{Catalogue, FilingsFilter, SecuritiesFilter};
use crate::gate::ConfigurationGate;
use crate::market::HistoryFilter;
use crate::resolver::IntrinioResolver;

pub struct IntrinioFunctions {
    resolver: IntrinioResolver,
    gate: ConfigurationGate,
}

impl IntrinioFunctions {
    pub fn new(resolver: IntrinioResolver, gate: ConfigurationGate) -> Self {
        Self { resolver, gate }
    }

    pub fn resolver(&self) -> &IntrinioResolver {
        &self.resolver
    }

    pub fn gate(&self) -> &ConfigurationGate {
        &self.gate
    }

    fn configured(&self) -> Result<(), CellValue> {
        if self.gate.ensure_configured() {
            Ok(())
        } else {
            Err(IntrinioError::NotConfigured.into())
        }
    }

    async fn checked(&self, identifier: &str) -> Result<(), CellValue> {
        self.configured()?;
        if self.resolver.identifiers().is_valid(identifier).await {
            Ok(())
        } else {
            Err(IntrinioError::InvalidIdentifier.into())
        }
    }

    pub async fn usage(&self, access_code: &str, key: &str) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.usage(access_code, key).await
    }

    pub async fn data_point(&self, identifier: &str, item: &str) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver.data_point(identifier, item).await
    }

    pub async fn historical_prices(
        &self,
        identifier: &str,
        item: &str,
        sequence: u32,
        filter: &HistoryFilter,
    ) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver
            .historical_prices(identifier, item, sequence, filter)
            .await
    }

    pub async fn historical_data(
        &self,
        identifier: &str,
        item: &str,
        sequence: u32,
        filter: &HistoryFilter,
        show_date: bool,
    ) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver
            .historical_data(identifier, item, sequence, filter, show_date)
            .await
    }

    pub async fn news(&self, identifier: &str, item: &str, sequence: u32) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver.news(identifier, item, sequence).await
    }

    pub async fn fundamentals(
        &self,
        identifier: &str,
        statement: &str,
        period_type: Option<&str>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver
            .fundamentals(identifier, statement, period_type, sequence, item)
            .await
    }

    pub async fn tags(
        &self,
        identifier: &str,
        statement: &str,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver.tags(identifier, statement, sequence, item).await
    }

    pub async fn financials(
        &self,
        identifier: &str,
        statement: &str,
        fiscal_year: i32,
        fiscal_period: &str,
        tag: &str,
    ) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver
            .financials(identifier, statement, fiscal_year, fiscal_period, tag)
            .await
    }

    pub async fn reported_fundamentals(
        &self,
        identifier: &str,
        statement: &str,
        period_type: Option<&str>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver
            .reported_fundamentals(identifier, statement, period_type, sequence, item)
            .await
    }

    pub async fn reported_tags(
        &self,
        identifier: &str,
        statement: &str,
        fiscal_year: i32,
        fiscal_period: &str,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver
            .reported_tags(identifier, statement, fiscal_year, fiscal_period, sequence, item)
            .await
    }

    pub async fn reported_financials(
        &self,
        identifier: &str,
        statement: &str,
        fiscal_year: i32,
        fiscal_period: &str,
        xbrl_tag: &str,
        domain_tag: Option<&str>,
    ) -> CellValue {
        if let Err(cell) = self.checked(identifier).await {
            return cell;
        }
        self.resolver
            .reported_financials(
                identifier,
                statement,
                fiscal_year,
                fiscal_period,
                xbrl_tag,
                domain_tag,
            )
            .await
    }

    pub async fn companies(
        &self,
        query: Option<&str>,
        latest_filing_date: Option<&DateInput>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver
            .companies(query, latest_filing_date, sequence, item)
            .await
    }

    pub async fn companies_count(
        &self,
        query: Option<&str>,
        latest_filing_date: Option<&DateInput>,
    ) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.companies_count(query, latest_filing_date).await
    }

    pub async fn company(&self, identifier: &str, item: &str) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.company(identifier, item).await
    }

    pub async fn securities(
        &self,
        filter: &SecuritiesFilter,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.securities(filter, sequence, item).await
    }

    pub async fn securities_count(&self, filter: &SecuritiesFilter) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.securities_count(filter).await
    }

    pub async fn security(&self, identifier: &str, item: &str) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.security(identifier, item).await
    }

    pub async fn indices(
        &self,
        query: Option<&str>,
        index_type: Option<&str>,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.indices(query, index_type, sequence, item).await
    }

    pub async fn indices_count(&self, query: Option<&str>, index_type: Option<&str>) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.indices_count(query, index_type).await
    }

    pub async fn index(&self, identifier: &str, item: &str) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.index(identifier, item).await
    }

    pub async fn sec_filings(
        &self,
        identifier: &str,
        filter: &FilingsFilter,
        sequence: u32,
        item: &str,
    ) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver
            .sec_filings(identifier, filter, sequence, item)
            .await
    }

    pub async fn sec_filings_count(&self, identifier: &str, filter: &FilingsFilter) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.sec_filings_count(identifier, filter).await
    }

    pub async fn catalogue_count(&self, catalogue: &Catalogue) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.catalogue_count(catalogue).await
    }

    pub async fn catalogue_item(&self, catalogue: &Catalogue, sequence: u32) -> CellValue {
        if let Err(cell) = self.configured() {
            return cell;
        }
        self.resolver.catalogue_item(catalogue, sequence).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{page_body, FakeApi};
    use intrinio_core::{CredentialStore, IntrinioResult};
    use serde_json::json;
    use std::sync::Arc;

    struct FixedStore(bool);

    impl CredentialStore for FixedStore {
        fn is_configured(&self) -> bool {
            self.0
        }

        fn save(&self, _username: &str, _password: &str) -> IntrinioResult<()> {
            Ok(())
        }
    }

    fn functions(api: Arc<FakeApi>, configured: bool) -> IntrinioFunctions {
        IntrinioFunctions::new(
            IntrinioResolver::new(api),
            ConfigurationGate::new(Arc::new(FixedStore(configured))),
        )
    }

    #[tokio::test]
    async fn test_unconfigured_calls_never_reach_api() {
        let api = FakeApi::new();
        let functions = functions(api.clone(), false);

        assert_eq!(
            functions.data_point("AAPL", "close_price").await,
            CellValue::text("No configuration")
        );
        assert_eq!(
            functions.companies(Some("IBM"), None, 0, "name").await,
            CellValue::text("No configuration")
        );
        assert_eq!(
            functions.usage("com_fin_data", "current").await,
            CellValue::text("No configuration")
        );
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_identifier_is_rejected_before_fetch() {
        let api = FakeApi::new();
        let functions = functions(api.clone(), true);

        assert_eq!(
            functions.news("ZZZZZ", "title", 0).await,
            CellValue::text("Invalid identifier")
        );
        assert_eq!(
            functions.financials("", "income_statement", 2016, "FY", "netincome").await,
            CellValue::text("Invalid identifier")
        );
        assert_eq!(api.calls_to("/news"), 0);
        assert_eq!(api.calls_to("/financials/standardized"), 0);
    }

    #[tokio::test]
    async fn test_valid_identifier_reaches_resolver() {
        let api = FakeApi::new();
        api.on("/companies/verify", &[("ticker", "AAPL")], 200, json!({"ticker": "AAPL"}));
        api.on(
            "/news",
            &[("identifier", "AAPL")],
            200,
            page_body(vec![json!({"title": "Apple unveils"})], 1),
        );
        let functions = functions(api.clone(), true);

        assert_eq!(
            functions.news("AAPL", "title", 0).await,
            CellValue::text("Apple unveils")
        );
        assert_eq!(functions.news("AAPL", "title", 0).await, CellValue::text("Apple unveils"));
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_directory_lookups_skip_identifier_check() {
        let api = FakeApi::new();
        api.on("/indices", &[("identifier", "$SPX")], 200, json!({"symbol": "$SPX"}));
        let functions = functions(api.clone(), true);

        assert_eq!(functions.index("$SPX", "symbol").await, CellValue::text("$SPX"));
        assert_eq!(api.calls(), 1);
    }
}
