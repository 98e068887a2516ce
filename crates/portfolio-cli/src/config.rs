//! Command-line flags and the resolved application configuration

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use portfolio_agent::ExecutorConfig;
use portfolio_core::{
    DEFAULT_TRIALS, PortfolioError, Result, SamplerConfig, ZeroVolatilityPolicy,
};
use portfolio_data::WrdsConfig;
use portfolio_llm::providers::OpenAIConfig;
use portfolio_utils::{LogFormat, parse_value};
use portfolio_viz::{JsonRenderer, Renderer, TerminalRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererKind {
    /// Text charts on stdout
    Terminal,
    /// JSON chart payloads in --output-dir
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "portfolio")]
#[command(version, about = "Interactive portfolio research over CRSP daily returns", long_about = None)]
pub struct Args {
    /// Random portfolios per frontier or Sharpe chart
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    pub trials: usize,

    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Drop zero-volatility portfolios instead of keeping them without a Sharpe ratio
    #[arg(long)]
    pub skip_zero_volatility: bool,

    #[arg(long, value_enum, default_value_t = RendererKind::Terminal)]
    pub renderer: RendererKind,

    /// Directory for JSON chart payloads
    #[arg(long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Chat model (defaults to OPENAI_MODEL, then gpt-4o-mini)
    #[arg(long)]
    pub model: Option<String>,

    /// Log line format: text or json
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// WRDS username (defaults to WRDS_USERNAME)
    #[arg(long)]
    pub username: Option<String>,
}

/// Everything the session needs, from flags and environment
#[derive(Clone)]
pub struct AppConfig {
    pub wrds: WrdsConfig,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `None` when no API key is configured; the assistant is then unavailable
    pub openai: Option<OpenAIConfig>,
    pub executor: ExecutorConfig,
    pub sampler: SamplerConfig,
    pub renderer: RendererKind,
    pub output_dir: PathBuf,
}

impl AppConfig {
    /// Resolve flags against the process environment
    pub fn from_args(args: Args) -> Result<Self> {
        Self::resolve(args, portfolio_utils::env_var)
    }

    /// Resolve flags against `env`; flags win over variables
    pub fn resolve(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut wrds = WrdsConfig::default();
        if let Some(host) = env("WRDS_HOST") {
            wrds = wrds.with_host(host);
        }
        if let Some(port) = parsed(&env, "WRDS_PORT")? {
            wrds = wrds.with_port(port);
        }
        if let Some(database) = env("WRDS_DATABASE") {
            wrds = wrds.with_database(database);
        }
        if let Some(secs) = parsed(&env, "WRDS_CONNECT_TIMEOUT_SECS")? {
            wrds = wrds.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parsed(&env, "WRDS_QUERY_TIMEOUT_SECS")? {
            wrds = wrds.with_query_timeout(Duration::from_secs(secs));
        }

        let openai = env("OPENAI_API_KEY").map(|key| {
            let config = OpenAIConfig::new(key);
            match env("OPENAI_API_BASE") {
                Some(base) => config.with_api_base(base),
                None => config,
            }
        });

        let mut executor = ExecutorConfig::default();
        if let Some(model) = args.model.or_else(|| env("OPENAI_MODEL")) {
            executor = executor.with_model(model);
        }

        let mut sampler = SamplerConfig::default().with_trials(args.trials);
        if let Some(seed) = args.seed {
            sampler = sampler.with_seed(seed);
        }
        if args.skip_zero_volatility {
            sampler = sampler.with_zero_volatility(ZeroVolatilityPolicy::Skip);
        }

        Ok(Self {
            wrds,
            username: args.username.or_else(|| env("WRDS_USERNAME")),
            password: env("WRDS_PASSWORD"),
            openai,
            executor,
            sampler,
            renderer: args.renderer,
            output_dir: args.output_dir,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.wrds.validate()?;
        self.sampler.validate()?;
        self.executor.validate()?;
        if let Some(openai) = &self.openai {
            openai.validate()?;
        }
        Ok(())
    }

    pub fn build_renderer(&self) -> Arc<dyn Renderer> {
        match self.renderer {
            RendererKind::Terminal => Arc::new(TerminalRenderer::stdout()),
            RendererKind::Json => Arc::new(JsonRenderer::new(&self.output_dir)),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("wrds", &self.wrds)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("openai", &self.openai)
            .field("executor", &self.executor)
            .field("sampler", &self.sampler)
            .field("renderer", &self.renderer)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

fn parsed<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    env(key)
        .map(|raw| parse_value(key, &raw))
        .transpose()
        .map_err(|e| PortfolioError::Config(e.to_string()))
}
