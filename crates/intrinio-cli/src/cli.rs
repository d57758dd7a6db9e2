use clap::{Args, Parser, Subcommand, ValueEnum};
use intrinio_core::DateInput;
use intrinio_resolver::{Catalogue, FilingsFilter, HistoryFilter, SecuritiesFilter};

pub const DEFAULT_ACCESS_CODE: &str = "com_fin_data";

#[derive(Debug, Parser)]
#[command(
    name = "intrinio",
    version,
    about = "Look up single Intrinio values from the command line",
    after_help = "A fiscal year below 1900 selects the n-th filing, with the fiscal period as its period type."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Account usage statistics and add-in version info
    Stats {
        #[arg(long, default_value = DEFAULT_ACCESS_CODE)]
        access_code: String,
    },
    /// Store credentials
    Login,
    /// One data point for an identifier
    DataPoint(EntityArgs),
    /// Historical stock prices
    Prices(HistoryArgs),
    /// Historical data series
    HistoricalData {
        #[command(flatten)]
        history: HistoryArgs,
        /// Return the date of the entry instead of its value
        #[arg(long)]
        show_date: bool,
    },
    /// Company news
    News(SeriesArgs),
    /// Standardized fundamentals
    Fundamentals(FundamentalsArgs),
    /// As-reported fundamentals
    ReportedFundamentals(FundamentalsArgs),
    /// Standardized tags of a statement
    Tags(TagsArgs),
    /// As-reported XBRL tags of a filing
    ReportedTags(ReportedTagsArgs),
    /// Standardized financial statement value
    Financials(FinancialsArgs),
    /// As-reported financial statement value
    ReportedFinancials {
        #[command(flatten)]
        statement: FinancialsArgs,
        #[arg(long)]
        domain: Option<String>,
    },
    /// Company master data
    Company(EntityArgs),
    /// Security master data
    Security(EntityArgs),
    /// Index master data
    Index(EntityArgs),
    /// Companies query
    Companies {
        #[command(flatten)]
        listing: ListingArgs,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        latest_filing_date: Option<String>,
    },
    /// Securities query
    Securities {
        #[command(flatten)]
        listing: ListingArgs,
        #[arg(long)]
        query: Option<String>,
        #[arg(long = "exchange")]
        exchange_symbol: Option<String>,
        #[arg(long = "adj-date")]
        last_crsp_adj_date: Option<String>,
    },
    /// Indices query
    Indices {
        #[command(flatten)]
        listing: ListingArgs,
        #[arg(long)]
        query: Option<String>,
        #[arg(long = "type")]
        index_type: Option<String>,
    },
    /// SEC filings of a company
    Filings {
        identifier: String,
        #[command(flatten)]
        listing: ListingArgs,
        #[arg(long)]
        report_type: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Item names a catalogue offers
    Items {
        #[arg(value_enum)]
        catalogue: CatalogueArg,
        /// Indices query used as the benchmark
        #[arg(long)]
        query: Option<String>,
        #[arg(long = "type")]
        index_type: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct EntityArgs {
    pub identifier: String,
    pub item: String,
}

#[derive(Debug, Args)]
pub struct SeriesArgs {
    pub identifier: String,
    pub item: String,
    #[arg(default_value_t = 0)]
    pub sequence: u32,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub series: SeriesArgs,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    /// daily, weekly, monthly, quarterly or yearly
    #[arg(long)]
    pub frequency: Option<String>,
    #[arg(long = "type")]
    pub period_type: Option<String>,
}

impl HistoryArgs {
    pub fn filter(&self) -> HistoryFilter {
        HistoryFilter {
            start_date: date(&self.start),
            end_date: date(&self.end),
            frequency: self.frequency.clone(),
            period_type: self.period_type.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct FundamentalsArgs {
    pub identifier: String,
    pub statement: String,
    pub item: String,
    #[arg(default_value_t = 0)]
    pub sequence: u32,
    /// FY, QTR, TTM or YTD
    #[arg(long = "type")]
    pub period_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct TagsArgs {
    pub identifier: String,
    pub statement: String,
    pub item: String,
    #[arg(default_value_t = 0)]
    pub sequence: u32,
}

#[derive(Debug, Args)]
pub struct ReportedTagsArgs {
    pub identifier: String,
    pub statement: String,
    pub fiscal_year: i32,
    pub fiscal_period: String,
    pub item: String,
    #[arg(default_value_t = 0)]
    pub sequence: u32,
}

#[derive(Debug, Args)]
pub struct FinancialsArgs {
    pub identifier: String,
    pub statement: String,
    pub fiscal_year: i32,
    pub fiscal_period: String,
    pub tag: String,
}

/// Either one item of the n-th record, or `--count`.
#[derive(Debug, Args)]
pub struct ListingArgs {
    #[arg(required_unless_present = "count")]
    pub item: Option<String>,
    #[arg(default_value_t = 0)]
    pub sequence: u32,
    /// Print the number of results instead of an item
    #[arg(long)]
    pub count: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogueArg {
    Companies,
    Company,
    Securities,
    Security,
    Indices,
    Index,
    Filings,
}

impl CatalogueArg {
    pub fn catalogue(self, query: Option<String>, index_type: Option<String>) -> Catalogue {
        match self {
            CatalogueArg::Companies => Catalogue::Companies,
            CatalogueArg::Company => Catalogue::Company,
            CatalogueArg::Securities => Catalogue::Securities,
            CatalogueArg::Security => Catalogue::Security,
            CatalogueArg::Indices => Catalogue::Indices { query, index_type },
            CatalogueArg::Index => Catalogue::Index,
            CatalogueArg::Filings => Catalogue::SecFilings,
        }
    }
}

pub fn date(value: &Option<String>) -> Option<DateInput> {
    value.as_deref().map(DateInput::from)
}

pub fn securities_filter(
    query: &Option<String>,
    exchange_symbol: &Option<String>,
    last_crsp_adj_date: &Option<String>,
) -> SecuritiesFilter {
    SecuritiesFilter {
        query: query.clone(),
        exchange_symbol: exchange_symbol.clone(),
        last_crsp_adj_date: date(last_crsp_adj_date),
    }
}

pub fn filings_filter(
    report_type: &Option<String>,
    start: &Option<String>,
    end: &Option<String>,
) -> FilingsFilter {
    FilingsFilter {
        report_type: report_type.clone(),
        start_date: date(start),
        end_date: date(end),
    }
}
