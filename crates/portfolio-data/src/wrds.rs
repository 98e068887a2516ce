//! WRDS (Wharton Research Data Services) client
//!
//! WRDS exposes CRSP as a PostgreSQL database. Two queries are needed:
//! ticker → PERMNO resolution from the name history, and daily returns from
//! the daily stock file. Both are parameterized; tickers and identifiers are
//! bound as arrays and never spliced into SQL text.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use portfolio_core::{DateRange, InstrumentId, InstrumentRecord, Observation};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::Row;
use tracing::{debug, info, instrument};

use crate::error::{DataError, Result};
use crate::source::MarketDataSource;

const DEFAULT_HOST: &str = "wrds-pgdata.wharton.upenn.edu";
const DEFAULT_PORT: u16 = 9737;
const DEFAULT_DATABASE: &str = "wrds";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 120;

const LOOKUP_INSTRUMENTS_SQL: &str = "\
    SELECT permno::bigint AS permno, ticker::text AS ticker, comnam::text AS comnam \
    FROM crsp.stocknames \
    WHERE ticker = ANY($1) \
    ORDER BY ticker, nameenddt";

const FETCH_OBSERVATIONS_SQL: &str = "\
    SELECT permno::bigint AS permno, date, prc::float8 AS price, vol::float8 AS volume, \
           ret::float8 AS ret \
    FROM crsp.dsf \
    WHERE date BETWEEN $1 AND $2 AND permno = ANY($3)";

/// Connection settings for the WRDS PostgreSQL endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrdsConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Require TLS (WRDS refuses plain connections)
    pub require_tls: bool,
    pub connect_timeout: Duration,
    /// Applied to every individual query
    pub query_timeout: Duration,
}

impl Default for WrdsConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            require_tls: true,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

impl WrdsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_tls(mut self, require_tls: bool) -> Self {
        self.require_tls = require_tls;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(DataError::Config("host cannot be empty".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(DataError::Config("database cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(DataError::Config("port cannot be 0".to_string()));
        }
        if self.connect_timeout.is_zero() || self.query_timeout.is_zero() {
            return Err(DataError::Config("timeouts must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

/// WRDS login, passed straight through to PostgreSQL
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(DataError::Config("username cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// CRSP access over a WRDS PostgreSQL connection
#[derive(Debug, Clone)]
pub struct WrdsClient {
    pool: PgPool,
    config: WrdsConfig,
    username: String,
}

impl WrdsClient {
    /// Open a connection, failing fast on bad credentials or an unreachable host
    #[instrument(skip_all, fields(endpoint = %config.endpoint(), user = %credentials.username))]
    pub async fn connect(config: WrdsConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        credentials.validate()?;

        let ssl_mode = if config.require_tls {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&credentials.username)
            .password(credentials.password())
            .ssl_mode(ssl_mode)
            .application_name("portfolio-rs");

        let connecting = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options);
        let pool = tokio::time::timeout(config.connect_timeout, connecting)
            .await
            .map_err(|_| DataError::ConnectTimeout(config.connect_timeout))?
            .map_err(|e| DataError::Connection(e.to_string()))?;

        info!("Connected to WRDS");
        Ok(Self {
            pool,
            username: credentials.username,
            config,
        })
    }

    pub fn config(&self) -> &WrdsConfig {
        &self.config
    }

    /// Close the pool, waiting for the connection to shut down
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn with_query_timeout<T, F>(&self, operation: &'static str, query: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        let timeout = self.config.query_timeout;
        tokio::time::timeout(timeout, query)
            .await
            .map_err(|_| DataError::QueryTimeout { operation, timeout })?
            .map_err(|e| DataError::Query(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl MarketDataSource for WrdsClient {
    #[instrument(skip(self), fields(count = tickers.len()))]
    async fn lookup_instruments(&self, tickers: &[String]) -> Result<Vec<InstrumentRecord>> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .with_query_timeout(
                "lookup_instruments",
                sqlx::query(LOOKUP_INSTRUMENTS_SQL)
                    .bind(tickers.to_vec())
                    .fetch_all(&self.pool),
            )
            .await?;

        let records = rows.iter().map(decode_instrument).collect::<Result<Vec<_>>>()?;
        debug!(records = records.len(), "Resolved tickers");
        Ok(records)
    }

    #[instrument(skip(self, ids), fields(range = %range, instruments = ids.len()))]
    async fn fetch_observations(
        &self,
        range: DateRange,
        ids: &[InstrumentId],
    ) -> Result<Vec<Observation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let permnos: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let rows = self
            .with_query_timeout(
                "fetch_observations",
                sqlx::query(FETCH_OBSERVATIONS_SQL)
                    .bind(range.start())
                    .bind(range.end())
                    .bind(permnos)
                    .fetch_all(&self.pool),
            )
            .await?;

        let observations = rows.iter().map(decode_observation).collect::<Result<Vec<_>>>()?;
        info!(observations = observations.len(), "Fetched daily observations");
        Ok(observations)
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.username, self.config.endpoint())
    }
}

fn decode_instrument(row: &PgRow) -> Result<InstrumentRecord> {
    let id: i64 = row
        .try_get("permno")
        .map_err(|e| DataError::Decode(format!("permno: {e}")))?;
    let ticker: String = row
        .try_get("ticker")
        .map_err(|e| DataError::Decode(format!("ticker: {e}")))?;
    let company_name: Option<String> = row
        .try_get("comnam")
        .map_err(|e| DataError::Decode(format!("comnam: {e}")))?;

    Ok(InstrumentRecord {
        id: InstrumentId(id),
        ticker,
        company_name,
    })
}

fn decode_observation(row: &PgRow) -> Result<Observation> {
    let id: i64 = row
        .try_get("permno")
        .map_err(|e| DataError::Decode(format!("permno: {e}")))?;
    let date: NaiveDate = row
        .try_get("date")
        .map_err(|e| DataError::Decode(format!("date: {e}")))?;
    let optional = |column: &str| -> Result<Option<f64>> {
        row.try_get(column)
            .map_err(|e| DataError::Decode(format!("{column}: {e}")))
    };

    Ok(Observation {
        date,
        id: InstrumentId(id),
        price: optional("price")?,
        volume: optional("volume")?,
        ret: optional("ret")?,
    })
}
