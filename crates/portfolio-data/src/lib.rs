//! Market data access for portfolio-rs
//!
//! [`MarketDataSource`] is the capability the interactive session talks to.
//! [`WrdsClient`] implements it against the WRDS PostgreSQL endpoint, reading
//! the CRSP name history (`crsp.stocknames`) and daily stock file
//! (`crsp.dsf`).

pub mod error;
pub mod source;
pub mod wrds;

pub use error::{DataError, Result};
pub use source::MarketDataSource;
pub use wrds::{Credentials, WrdsClient, WrdsConfig};
