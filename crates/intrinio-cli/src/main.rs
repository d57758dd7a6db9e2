//! intrinio: look up single Intrinio values from the command line.
//!
//! Usage:
//!   intrinio stats [--access-code com_fin_data]
//!   intrinio login
//!   intrinio data-point AAPL close_price
//!   intrinio prices AAPL close 0 --start 2017-01-01 --frequency weekly
//!   intrinio financials AAPL income_statement 2016 FY netincome
//!   intrinio items companies

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, ListingArgs};
use intrinio_client::{ConfigStore, IntrinioClient};
use intrinio_core::{CellValue, CredentialPrompt, CredentialStore, LoginOutcome};
use intrinio_resolver::{ConfigurationGate, IntrinioFunctions, IntrinioResolver};
use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;

/// Asks for credentials on the terminal.
struct TerminalPrompt;

impl TerminalPrompt {
    fn read_line(label: &str) -> Option<String> {
        print!("{}: ", label);
        std::io::stdout().flush().ok()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    }
}

impl CredentialPrompt for TerminalPrompt {
    fn prompt(&self) -> LoginOutcome {
        println!("Intrinio credentials are not configured.");
        let username = Self::read_line("Username").unwrap_or_default();
        if username.is_empty() {
            return LoginOutcome::Declined {
                do_not_ask_again: true,
            };
        }
        let password = Self::read_line("Password").unwrap_or_default();
        if password.is_empty() {
            return LoginOutcome::Declined {
                do_not_ask_again: true,
            };
        }
        LoginOutcome::Accepted { username, password }
    }
}

fn listing_item(listing: &ListingArgs) -> anyhow::Result<&str> {
    listing.item.as_deref().context("missing <ITEM>")
}

async fn stats(functions: &IntrinioFunctions, config: &ConfigStore, access_code: &str) {
    println!("Stats for Intrinio account with username {}", config.masked_user());

    let check = functions.usage(access_code, "access_code").await;
    match functions.resolver().usage_snapshot().get().await {
        Some(usage) => {
            for (key, value) in usage.iter() {
                println!("   {} : {}", key, CellValue::from_json(value));
            }
        }
        None => println!("   {}", check),
    }

    println!("Excel version info");
    match functions.resolver().excel_version().await {
        Ok(version) => {
            for (key, value) in version.iter() {
                println!("   {} : {}", key, CellValue::from_json(value));
            }
        }
        Err(e) => println!("   {}", CellValue::from(e)),
    }
}

async fn evaluate(functions: &IntrinioFunctions, command: Command) -> anyhow::Result<CellValue> {
    let value = match command {
        Command::DataPoint(args) => functions.data_point(&args.identifier, &args.item).await,
        Command::Prices(args) => {
            functions
                .historical_prices(
                    &args.series.identifier,
                    &args.series.item,
                    args.series.sequence,
                    &args.filter(),
                )
                .await
        }
        Command::HistoricalData { history, show_date } => {
            functions
                .historical_data(
                    &history.series.identifier,
                    &history.series.item,
                    history.series.sequence,
                    &history.filter(),
                    show_date,
                )
                .await
        }
        Command::News(args) => {
            functions
                .news(&args.identifier, &args.item, args.sequence)
                .await
        }
        Command::Fundamentals(args) => {
            functions
                .fundamentals(
                    &args.identifier,
                    &args.statement,
                    args.period_type.as_deref(),
                    args.sequence,
                    &args.item,
                )
                .await
        }
        Command::ReportedFundamentals(args) => {
            functions
                .reported_fundamentals(
                    &args.identifier,
                    &args.statement,
                    args.period_type.as_deref(),
                    args.sequence,
                    &args.item,
                )
                .await
        }
        Command::Tags(args) => {
            functions
                .tags(&args.identifier, &args.statement, args.sequence, &args.item)
                .await
        }
        Command::ReportedTags(args) => {
            functions
                .reported_tags(
                    &args.identifier,
                    &args.statement,
                    args.fiscal_year,
                    &args.fiscal_period,
                    args.sequence,
                    &args.item,
                )
                .await
        }
        Command::Financials(args) => {
            functions
                .financials(
                    &args.identifier,
                    &args.statement,
                    args.fiscal_year,
                    &args.fiscal_period,
                    &args.tag,
                )
                .await
        }
        Command::ReportedFinancials { statement, domain } => {
            functions
                .reported_financials(
                    &statement.identifier,
                    &statement.statement,
                    statement.fiscal_year,
                    &statement.fiscal_period,
                    &statement.tag,
                    domain.as_deref(),
                )
                .await
        }
        Command::Company(args) => functions.company(&args.identifier, &args.item).await,
        Command::Security(args) => functions.security(&args.identifier, &args.item).await,
        Command::Index(args) => functions.index(&args.identifier, &args.item).await,
        Command::Companies {
            listing,
            query,
            latest_filing_date,
        } => {
            let latest_filing_date = cli::date(&latest_filing_date);
            if listing.count {
                functions
                    .companies_count(query.as_deref(), latest_filing_date.as_ref())
                    .await
            } else {
                functions
                    .companies(
                        query.as_deref(),
                        latest_filing_date.as_ref(),
                        listing.sequence,
                        listing_item(&listing)?,
                    )
                    .await
            }
        }
        Command::Securities {
            listing,
            query,
            exchange_symbol,
            last_crsp_adj_date,
        } => {
            let filter = cli::securities_filter(&query, &exchange_symbol, &last_crsp_adj_date);
            if listing.count {
                functions.securities_count(&filter).await
            } else {
                functions
                    .securities(&filter, listing.sequence, listing_item(&listing)?)
                    .await
            }
        }
        Command::Indices {
            listing,
            query,
            index_type,
        } => {
            if listing.count {
                functions
                    .indices_count(query.as_deref(), index_type.as_deref())
                    .await
            } else {
                functions
                    .indices(
                        query.as_deref(),
                        index_type.as_deref(),
                        listing.sequence,
                        listing_item(&listing)?,
                    )
                    .await
            }
        }
        Command::Filings {
            identifier,
            listing,
            report_type,
            start,
            end,
        } => {
            let filter = cli::filings_filter(&report_type, &start, &end);
            if listing.count {
                functions.sec_filings_count(&identifier, &filter).await
            } else {
                functions
                    .sec_filings(&identifier, &filter, listing.sequence, listing_item(&listing)?)
                    .await
            }
        }
        Command::Stats { .. } | Command::Login | Command::Items { .. } => {
            anyhow::bail!("not a lookup command")
        }
    };
    Ok(value)
}

async fn list_items(
    functions: &IntrinioFunctions,
    catalogue: &intrinio_resolver::Catalogue,
) -> anyhow::Result<()> {
    let count = functions.catalogue_count(catalogue).await;
    let Some(count) = count.as_f64() else {
        println!("{}", count);
        return Ok(());
    };
    for sequence in 0..count as u32 {
        println!("{}", functions.catalogue_item(catalogue, sequence).await);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intrinio_cli=info,intrinio_resolver=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = Arc::new(ConfigStore::from_env());
    if let Some(path) = config.path() {
        tracing::info!("Using configuration {}", path.display());
    }

    if let Command::Login = cli.command {
        match TerminalPrompt.prompt() {
            LoginOutcome::Accepted { username, password } => {
                config.save(&username, &password)?;
                println!("Saved credentials for {}", config.masked_user());
            }
            LoginOutcome::Declined { .. } => println!("Login cancelled"),
        }
        return Ok(());
    }

    let client = IntrinioClient::new(config.clone());
    let mut gate = ConfigurationGate::new(config.clone());
    if std::io::stdin().is_terminal() {
        gate = gate.with_prompt(Arc::new(TerminalPrompt));
    }
    let functions = IntrinioFunctions::new(IntrinioResolver::new(Arc::new(client)), gate);

    match cli.command {
        Command::Stats { access_code } => stats(&functions, &config, &access_code).await,
        Command::Items {
            catalogue,
            query,
            index_type,
        } => list_items(&functions, &catalogue.catalogue(query, index_type)).await?,
        command => {
            let value = evaluate(&functions, command).await?;
            println!("{}", value);
        }
    }
    Ok(())
}
