//! Cached resolution of Intrinio data into single spreadsheet cells.
//!
//! [`IntrinioResolver`] owns the per-kind caches for one session and turns a
//! (query, sequence, item) request into one [`intrinio_core::CellValue`].
//! [`IntrinioFunctions`] adds the configuration and identifier checks a host
//! needs, and [`BlockingFunctions`] lets synchronous hosts call it.

pub mod blocking;
pub mod cache;
pub mod directory;
mod financials;
mod fundamentals;
pub mod functions;
pub mod gate;
pub mod identifier;
pub mod market;
pub mod resolver;
pub mod usage;

#[cfg(test)]
mod testing;

pub use blocking::BlockingFunctions;
pub use cache::{KeyedCache, PageKeyCache, QueryKey};
pub use directory::{Catalogue, FilingsFilter, SecuritiesFilter};
pub use functions::IntrinioFunctions;
pub use gate::ConfigurationGate;
pub use identifier::IdentifierValidator;
pub use market::HistoryFilter;
pub use resolver::IntrinioResolver;
pub use usage::UsageSnapshot;
