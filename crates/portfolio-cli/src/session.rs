//! Interactive session state and the handlers behind each command
//!
//! A handler either succeeds and updates the session, or fails and leaves
//! it exactly as it was.

use std::fmt::Write as _;
use std::sync::Arc;

use portfolio_agent::{
    AgentObserver, ExecutorConfig, PortfolioAgent, PortfolioContext, QuestionAnswerer,
};
use portfolio_core::{
    DateRange, FrontierSampler, FrontierSummary, InstrumentMap, LabelledPortfolio,
    PortfolioError, PortfolioStatistics, Result, ReturnMatrix, SharpeSummary,
    build_return_matrix, compute_statistics, normalize_tickers,
};
use portfolio_data::{Credentials, MarketDataSource, WrdsClient, WrdsConfig};
use portfolio_llm::providers::{OpenAIConfig, OpenAIProvider};
use portfolio_viz::Renderer;
use tracing::{info, instrument, warn};

/// Creates an assistant for freshly fetched data
pub trait AgentFactory: Send + Sync {
    fn create(&self, context: PortfolioContext) -> Result<Box<dyn QuestionAnswerer>>;
}

/// Builds [`PortfolioAgent`]s over an OpenAI-compatible endpoint
pub struct OpenAIAgentFactory {
    openai: Option<OpenAIConfig>,
    executor: ExecutorConfig,
    observer: Arc<dyn AgentObserver>,
}

impl OpenAIAgentFactory {
    pub fn new(
        openai: Option<OpenAIConfig>,
        executor: ExecutorConfig,
        observer: Arc<dyn AgentObserver>,
    ) -> Self {
        Self {
            openai,
            executor,
            observer,
        }
    }
}

impl AgentFactory for OpenAIAgentFactory {
    fn create(&self, context: PortfolioContext) -> Result<Box<dyn QuestionAnswerer>> {
        let config = self.openai.clone().ok_or_else(|| {
            PortfolioError::AgentFailure(
                "OPENAI_API_KEY is not set; the assistant is unavailable".to_string(),
            )
        })?;
        let provider = OpenAIProvider::with_config(config)?;
        let agent = PortfolioAgent::new(Arc::new(provider), context, self.executor.clone())?
            .with_observer(self.observer.clone());
        Ok(Box::new(agent))
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone)]
pub struct PortfolioData {
    pub instruments: InstrumentMap,
    pub matrix: ReturnMatrix,
    pub stats: PortfolioStatistics,
    pub range: DateRange,
}

pub struct Session {
    wrds: WrdsConfig,
    source: Option<Box<dyn MarketDataSource>>,
    data: Option<PortfolioData>,
    agent: Option<Box<dyn QuestionAnswerer>>,
    agent_factory: Box<dyn AgentFactory>,
    sampler: FrontierSampler,
    renderer: Arc<dyn Renderer>,
}

impl Session {
    pub fn new(
        wrds: WrdsConfig,
        sampler: FrontierSampler,
        renderer: Arc<dyn Renderer>,
        agent_factory: Box<dyn AgentFactory>,
    ) -> Self {
        Self {
            wrds,
            source: None,
            data: None,
            agent: None,
            agent_factory,
            sampler,
            renderer,
        }
    }

    pub fn data(&self) -> Option<&PortfolioData> {
        self.data.as_ref()
    }

    /// Log in to WRDS, replacing any previous connection
    pub async fn connect(&mut self, credentials: Credentials) -> Result<String> {
        let client = WrdsClient::connect(self.wrds.clone(), credentials).await?;
        Ok(self.attach_source(Box::new(client)))
    }

    /// Use `source` for subsequent fetches
    pub fn attach_source(&mut self, source: Box<dyn MarketDataSource>) -> String {
        let message = format!("Connected to {}", source.describe());
        info!(source = %source.describe(), "Data source attached");
        self.source = Some(source);
        message
    }

    #[instrument(skip(self))]
    pub async fn fetch(&mut self, tickers_text: &str, start: &str, end: &str) -> Result<String> {
        let source = self.source.as_deref().ok_or(PortfolioError::NotConnected)?;
        let tickers = normalize_tickers(tickers_text)?;
        let range = DateRange::parse(start, end)?;

        let records = source.lookup_instruments(&tickers).await?;
        if records.is_empty() {
            return Err(PortfolioError::EmptyResult(format!(
                "no CRSP identifiers found for {}",
                tickers.join(", ")
            )));
        }
        let instruments = InstrumentMap::from_records(records);
        let missing: Vec<String> = instruments
            .missing_tickers(&tickers)
            .into_iter()
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "Tickers without a CRSP identifier");
        }

        let observations = source.fetch_observations(range, &instruments.ids()).await?;
        if observations.is_empty() {
            return Err(PortfolioError::EmptyResult(format!(
                "no daily observations for {} between {range}",
                tickers.join(", ")
            )));
        }
        let matrix = build_return_matrix(&observations, &instruments)?;
        let stats = compute_statistics(&matrix)?;

        let mut message = format!(
            "Loaded {} trading days for {} ({range})",
            matrix.n_rows(),
            matrix.tickers().join(", ")
        );
        if !missing.is_empty() {
            let _ = write!(
                message,
                "\nwarning: no CRSP identifier for {}",
                missing.join(", ")
            );
        }
        let dropped: Vec<&str> = instruments
            .records()
            .map(|r| r.ticker.as_str())
            .filter(|t| !matrix.tickers().iter().any(|m| m == t))
            .collect();
        if !dropped.is_empty() {
            warn!(?dropped, "Tickers without a column in the return matrix");
            let _ = write!(
                message,
                "\nwarning: no usable returns for {}",
                dropped.join(", ")
            );
        }

        info!(
            rows = matrix.n_rows(),
            columns = matrix.n_cols(),
            "Portfolio data loaded"
        );
        self.data = Some(PortfolioData {
            instruments,
            matrix,
            stats,
            range,
        });
        self.agent = None;
        Ok(message)
    }

    pub fn plot_frontier(&self) -> Result<String> {
        let data = self.require_data()?;
        let points = self.sampler.sample(&data.stats)?;
        self.renderer
            .render_frontier(&points, data.stats.tickers())?;

        let summary = FrontierSummary::from_points(&points, data.stats.tickers());
        let mut message = format!(
            "Efficient frontier: {} random portfolios ({})",
            summary.portfolios,
            self.renderer.describe()
        );
        if let Some(best) = &summary.max_sharpe {
            let _ = write!(message, "\nmax Sharpe: {}", describe_portfolio(best));
        }
        if let Some(safest) = &summary.min_volatility {
            let _ = write!(message, "\nmin volatility: {}", describe_portfolio(safest));
        }
        Ok(message)
    }

    pub fn plot_sharpe(&self) -> Result<String> {
        let data = self.require_data()?;
        let points = self.sampler.sample(&data.stats)?;
        self.renderer.render_sharpe_distribution(&points)?;

        Ok(match SharpeSummary::from_points(&points) {
            Some(s) => format!(
                "Sharpe ratio distribution over {} portfolios: mean {:.4}, median {:.4}, range {:.4} to {:.4}",
                s.count, s.mean, s.median, s.min, s.max
            ),
            None => "No portfolio had a defined Sharpe ratio".to_string(),
        })
    }

    pub fn plot_returns(&self) -> Result<String> {
        let data = self.require_data()?;
        self.renderer.render_returns(&data.stats)?;
        Ok(format!(
            "Mean daily returns for {} tickers over {} days",
            data.stats.len(),
            data.stats.observations()
        ))
    }

    /// Answer a question, creating the assistant on first use after a fetch
    #[instrument(skip(self))]
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let data = self.require_data()?;
        let question = question.trim();
        if question.is_empty() {
            return Err(PortfolioError::InvalidInput("question is empty".to_string()));
        }

        if self.agent.is_none() {
            let context = PortfolioContext::new(
                data.matrix.clone(),
                data.stats.clone(),
                self.sampler.clone(),
                self.renderer.clone(),
            );
            self.agent = Some(self.agent_factory.create(context)?);
        }
        match &self.agent {
            Some(agent) => agent.answer(question).await,
            None => Err(PortfolioError::AgentFailure(
                "assistant is unavailable".to_string(),
            )),
        }
    }

    pub fn status(&self) -> String {
        let mut out = String::new();
        match &self.source {
            Some(source) => {
                let _ = writeln!(out, "connection: {}", source.describe());
            }
            None => out.push_str("connection: not connected\n"),
        }
        match self.data() {
            Some(data) => {
                let _ = writeln!(
                    out,
                    "data: {} ({}), {} trading days",
                    data.matrix.tickers().join(", "),
                    data.range,
                    data.matrix.n_rows()
                );
                for record in data.instruments.records() {
                    let _ = writeln!(
                        out,
                        "  {} {}: {}",
                        record.ticker,
                        record.id,
                        record.company_name.as_deref().unwrap_or("-")
                    );
                }
            }
            None => out.push_str("data: none\n"),
        }
        let _ = writeln!(
            out,
            "assistant: {}",
            if self.agent.is_some() { "ready" } else { "created on next question" }
        );
        let config = self.sampler.config();
        let _ = write!(
            out,
            "sampling: {} trials{}, charts: {}",
            config.trials,
            config
                .seed
                .map(|s| format!(" (seed {s})"))
                .unwrap_or_default(),
            self.renderer.describe()
        );
        out
    }

    fn require_data(&self) -> Result<&PortfolioData> {
        self.data.as_ref().ok_or(PortfolioError::NoData)
    }
}

fn describe_portfolio(p: &LabelledPortfolio) -> String {
    let weights: Vec<String> = p
        .weights
        .iter()
        .map(|(ticker, w)| format!("{ticker} {:.1}%", w * 100.0))
        .collect();
    format!(
        "return {:.5}, risk {:.5}, weights {}",
        p.expected_return,
        p.std_dev,
        weights.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use mockall::mock;
    use portfolio_core::{InstrumentId, InstrumentRecord, Observation, SamplerConfig};
    use portfolio_viz::JsonRenderer;
    use std::sync::Mutex;

    mock! {
        Source {}

        #[async_trait]
        impl MarketDataSource for Source {
            async fn lookup_instruments(&self, tickers: &[String]) -> portfolio_data::Result<Vec<InstrumentRecord>>;
            async fn fetch_observations(
                &self,
                range: DateRange,
                ids: &[InstrumentId],
            ) -> portfolio_data::Result<Vec<Observation>>;
            fn describe(&self) -> String;
        }
    }

    mock! {
        Answerer {}

        #[async_trait]
        impl QuestionAnswerer for Answerer {
            async fn answer(&self, question: &str) -> Result<String>;
        }
    }

    /// Hands out a prepared answerer and records the contexts it was given
    struct StubFactory {
        answerers: Mutex<Vec<MockAnswerer>>,
        contexts: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl StubFactory {
        fn new(answerers: Vec<MockAnswerer>) -> (Self, Arc<Mutex<Vec<Vec<String>>>>) {
            let contexts = Arc::new(Mutex::new(Vec::new()));
            let factory = Self {
                answerers: Mutex::new(answerers),
                contexts: contexts.clone(),
            };
            (factory, contexts)
        }
    }

    impl AgentFactory for StubFactory {
        fn create(&self, context: PortfolioContext) -> Result<Box<dyn QuestionAnswerer>> {
            self.contexts
                .lock()
                .unwrap()
                .push(context.matrix.tickers().to_vec());
            let answerer = self
                .answerers
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| PortfolioError::AgentFailure("no stub left".to_string()))?;
            Ok(Box::new(answerer))
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(id: i64, ticker: &str) -> InstrumentRecord {
        InstrumentRecord::new(InstrumentId(id), ticker, format!("{ticker} INC"))
    }

    /// AAPL (10107) and MSFT (14593) on three days
    fn source() -> MockSource {
        let mut source = MockSource::new();
        source.expect_describe().return_const("mock@test".to_string());
        source
            .expect_lookup_instruments()
            .returning(|tickers| {
                Ok([record(10107, "AAPL"), record(14593, "MSFT")]
                    .into_iter()
                    .filter(|r| tickers.contains(&r.ticker))
                    .collect())
            });
        source.expect_fetch_observations().returning(|_, ids| {
            let rows = [
                (2, 10107, 0.01),
                (2, 14593, 0.02),
                (3, 10107, -0.005),
                (3, 14593, 0.004),
                (4, 10107, 0.007),
                (4, 14593, -0.001),
            ];
            Ok(rows
                .into_iter()
                .filter(|(_, id, _)| ids.contains(&InstrumentId(*id)))
                .map(|(d, id, r)| Observation::with_return(date(d), InstrumentId(id), r))
                .collect())
        });
        source
    }

    fn session(dir: &std::path::Path, answerers: Vec<MockAnswerer>) -> (Session, Arc<Mutex<Vec<Vec<String>>>>) {
        let (factory, contexts) = StubFactory::new(answerers);
        let session = Session::new(
            WrdsConfig::default(),
            FrontierSampler::new(SamplerConfig::default().with_trials(200).with_seed(3)),
            Arc::new(JsonRenderer::new(dir)),
            Box::new(factory),
        );
        (session, contexts)
    }

    #[tokio::test]
    async fn test_fetch_requires_connection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);

        let err = session
            .fetch("AAPL", "2024-01-01", "2024-01-31")
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::NotConnected));
        assert!(session.data().is_none());
    }

    #[tokio::test]
    async fn test_fetch_builds_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);
        assert_eq!(session.attach_source(Box::new(source())), "Connected to mock@test");

        let message = session
            .fetch(" msft, AAPL, aapl, NOPE ", "2024-01-01", "2024-01-31")
            .await
            .unwrap();

        assert!(message.starts_with("Loaded 3 trading days for AAPL, MSFT"));
        assert!(message.contains("warning: no CRSP identifier for NOPE"));
        let data = session.data().unwrap();
        assert_eq!(data.matrix.n_cols(), 2);
        assert_eq!(data.stats.observations(), 3);
        assert!((data.stats.expected_returns()[0] - 0.004).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_fetch_failures_keep_previous_data() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);
        session.attach_source(Box::new(source()));
        session
            .fetch("AAPL, MSFT", "2024-01-01", "2024-01-31")
            .await
            .unwrap();

        let err = session
            .fetch("NOPE", "2024-01-01", "2024-01-31")
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::EmptyResult(_)));

        let err = session
            .fetch("AAPL", "2024-02-01", "2024-01-01")
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidInput(_)));

        let err = session.fetch(" , ", "2024-01-01", "2024-01-31").await.unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidInput(_)));

        assert_eq!(session.data().unwrap().matrix.tickers(), ["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_fetch_without_observations() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);
        let mut source = MockSource::new();
        source.expect_describe().return_const("empty".to_string());
        source
            .expect_lookup_instruments()
            .returning(|_| Ok(vec![record(10107, "AAPL")]));
        source.expect_fetch_observations().returning(|_, _| Ok(vec![]));
        session.attach_source(Box::new(source));

        let err = session
            .fetch("AAPL", "1990-01-01", "1990-01-31")
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::EmptyResult(ref m) if m.contains("no daily observations")));
    }

    #[tokio::test]
    async fn test_single_day_is_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);
        let mut source = MockSource::new();
        source.expect_describe().return_const("one-day".to_string());
        source
            .expect_lookup_instruments()
            .returning(|_| Ok(vec![record(10107, "AAPL")]));
        source.expect_fetch_observations().returning(|_, _| {
            Ok(vec![Observation::with_return(date(2), InstrumentId(10107), 0.01)])
        });
        session.attach_source(Box::new(source));

        let err = session
            .fetch("AAPL", "2024-01-02", "2024-01-02")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PortfolioError::InsufficientData {
                required: 2,
                actual: 1
            }
        ));
        assert!(session.data().is_none());
    }

    #[tokio::test]
    async fn test_plots_require_data() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);

        assert!(matches!(session.plot_frontier(), Err(PortfolioError::NoData)));
        assert!(matches!(session.plot_sharpe(), Err(PortfolioError::NoData)));
        assert!(matches!(session.plot_returns(), Err(PortfolioError::NoData)));
        assert!(matches!(session.ask("hi").await, Err(PortfolioError::NoData)));
    }

    #[tokio::test]
    async fn test_plots_write_charts() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);
        session.attach_source(Box::new(source()));
        session
            .fetch("AAPL, MSFT", "2024-01-01", "2024-01-31")
            .await
            .unwrap();

        let frontier = session.plot_frontier().unwrap();
        assert!(frontier.starts_with("Efficient frontier: 200 random portfolios"));
        assert!(frontier.contains("max Sharpe: return"));
        assert!(session.plot_sharpe().unwrap().contains("over 200 portfolios"));
        assert!(session.plot_returns().unwrap().starts_with("Mean daily returns for 2 tickers"));

        for file in ["efficient_frontier.json", "sharpe_distribution.json", "returns.json"] {
            assert!(dir.path().join(file).exists(), "{file} missing");
        }
    }

    #[tokio::test]
    async fn test_agent_is_created_lazily_and_reset_by_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut second = MockAnswerer::new();
        second
            .expect_answer()
            .returning(|_| Ok("only AAPL now".to_string()));
        let mut first = MockAnswerer::new();
        first
            .expect_answer()
            .times(2)
            .returning(|q| Ok(format!("answer to {q}")));
        // The factory pops from the back
        let (mut session, contexts) = session(dir.path(), vec![second, first]);
        session.attach_source(Box::new(source()));
        session
            .fetch("AAPL, MSFT", "2024-01-01", "2024-01-31")
            .await
            .unwrap();

        assert_eq!(session.ask(" best stock? ").await.unwrap(), "answer to best stock?");
        assert_eq!(session.ask("and now?").await.unwrap(), "answer to and now?");
        assert_eq!(contexts.lock().unwrap().len(), 1);

        session
            .fetch("AAPL", "2024-01-01", "2024-01-31")
            .await
            .unwrap();
        assert_eq!(session.ask("again").await.unwrap(), "only AAPL now");
        assert_eq!(
            *contexts.lock().unwrap(),
            vec![vec!["AAPL".to_string(), "MSFT".to_string()], vec!["AAPL".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, contexts) = session(dir.path(), vec![]);
        session.attach_source(Box::new(source()));
        session
            .fetch("AAPL", "2024-01-01", "2024-01-31")
            .await
            .unwrap();

        assert!(matches!(
            session.ask("  ").await,
            Err(PortfolioError::InvalidInput(_))
        ));
        assert!(contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let factory = OpenAIAgentFactory::new(
            None,
            ExecutorConfig::default(),
            Arc::new(portfolio_agent::NoopObserver),
        );
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(
            WrdsConfig::default(),
            FrontierSampler::new(SamplerConfig::default().with_trials(10)),
            Arc::new(JsonRenderer::new(dir.path())),
            Box::new(factory),
        );
        session.attach_source(Box::new(source()));
        session
            .fetch("AAPL", "2024-01-01", "2024-01-31")
            .await
            .unwrap();

        let err = session.ask("anything").await.unwrap_err();
        assert!(matches!(err, PortfolioError::AgentFailure(ref m) if m.contains("OPENAI_API_KEY")));
        assert!(session.status().contains("assistant: created on next question"));
    }

    #[tokio::test]
    async fn test_connect_rejects_blank_username() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);

        let err = session.connect(Credentials::new(" ", "secret")).await.unwrap_err();
        assert!(matches!(err, PortfolioError::Config(_)));
        assert!(session.status().starts_with("connection: not connected"));
    }

    #[tokio::test]
    async fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session(dir.path(), vec![]);
        assert!(session.status().starts_with("connection: not connected\ndata: none"));

        session.attach_source(Box::new(source()));
        session
            .fetch("AAPL, MSFT", "2024-01-01", "2024-01-31")
            .await
            .unwrap();
        let status = session.status();
        assert!(status.contains("connection: mock@test"));
        assert!(status.contains("data: AAPL, MSFT (2024-01-01 to 2024-01-31), 3 trading days"));
        assert!(status.contains("  MSFT 14593: MSFT INC"));
        assert!(status.contains("sampling: 200 trials (seed 3)"));
    }
}
