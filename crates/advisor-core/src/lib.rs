//! Shared data model for the advisor workspace
//!
//! This crate defines the market data types passed between the analytics
//! engine and the analysis workflow, plus the workspace-wide error type.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{CompanyProfile, MacroSnapshot, NewsItem, PricePoint, PriceSeries, TimeHorizon};
