//! REPL command parsing

use portfolio_core::{PortfolioError, Result};

pub const DEFAULT_TICKERS: &str = "AAPL, MSFT, TSLA, AMZN, GOOGL";
pub const DEFAULT_START: &str = "2020-01-01";
pub const DEFAULT_END: &str = "2025-01-01";

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in to WRDS
    Connect { username: Option<String> },
    /// Load daily returns for a set of tickers
    Fetch {
        tickers: String,
        start: String,
        end: String,
    },
    Frontier,
    Sharpe,
    Returns,
    /// Question for the assistant; plain text parses to this too
    Ask { question: String },
    Status,
    Help,
    Exit,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PortfolioError::InvalidInput("empty input".to_string()));
        }

        let Some(rest) = input.strip_prefix('/') else {
            return Ok(Command::Ask {
                question: input.to_string(),
            });
        };

        let (cmd, args) = match rest.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, args.trim()),
            None => (rest, ""),
        };

        match cmd.to_lowercase().as_str() {
            "connect" | "c" => Ok(Command::Connect {
                username: args.split_whitespace().next().map(str::to_string),
            }),
            "fetch" | "f" => parse_fetch(args),
            "frontier" | "ef" => Ok(Command::Frontier),
            "sharpe" | "s" => Ok(Command::Sharpe),
            "returns" | "r" => Ok(Command::Returns),
            "ask" | "a" => {
                if args.is_empty() {
                    return Err(PortfolioError::InvalidInput(
                        "usage: /ask <question>".to_string(),
                    ));
                }
                Ok(Command::Ask {
                    question: args.to_string(),
                })
            }
            "status" => Ok(Command::Status),
            "help" | "h" | "?" => Ok(Command::Help),
            "exit" | "quit" | "q" => Ok(Command::Exit),
            "" => Err(PortfolioError::InvalidInput("empty command".to_string())),
            other => Err(PortfolioError::InvalidInput(format!(
                "unknown command: /{other} (try /help)"
            ))),
        }
    }

    pub fn help_text() -> &'static str {
        r"
Commands
========
  /connect [user]                 Log in to WRDS (password from WRDS_PASSWORD or prompt)
  /fetch <tickers> <start> <end>  Load daily returns, e.g. /fetch AAPL, MSFT 2020-01-01 2025-01-01
  /fetch                          Load the default tickers (AAPL, MSFT, TSLA, AMZN, GOOGL) for 2020-2024
  /frontier                       Plot the efficient frontier of random portfolios
  /sharpe                         Plot the Sharpe ratio distribution
  /returns                        Plot mean daily return per ticker
  /ask <question>                 Ask the assistant about the loaded data
  /status                         Show connection and data status
  /help                           Show this help
  /exit                           Quit

Aliases: /c /f /ef /s /r /a /h /q
Text without a leading / is sent to the assistant.
"
    }
}

/// Tickers are everything before the two trailing dates, so `AAPL, MSFT` may contain spaces
fn parse_fetch(args: &str) -> Result<Command> {
    if args.is_empty() {
        return Ok(Command::Fetch {
            tickers: DEFAULT_TICKERS.to_string(),
            start: DEFAULT_START.to_string(),
            end: DEFAULT_END.to_string(),
        });
    }

    let parts: Vec<&str> = args.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(PortfolioError::InvalidInput(
            "usage: /fetch <tickers> <start> <end> (dates as YYYY-MM-DD)".to_string(),
        ));
    }
    let (tickers, dates) = parts.split_at(parts.len() - 2);
    Ok(Command::Fetch {
        tickers: tickers.join(" "),
        start: dates[0].to_string(),
        end: dates[1].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch() {
        let cmd = Command::parse("/fetch AAPL, MSFT ,tsla 2020-01-01 2025-01-01").unwrap();
        assert_eq!(
            cmd,
            Command::Fetch {
                tickers: "AAPL, MSFT ,tsla".to_string(),
                start: "2020-01-01".to_string(),
                end: "2025-01-01".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_fetch_defaults() {
        let cmd = Command::parse("/f").unwrap();
        assert_eq!(
            cmd,
            Command::Fetch {
                tickers: DEFAULT_TICKERS.to_string(),
                start: DEFAULT_START.to_string(),
                end: DEFAULT_END.to_string(),
            }
        );
    }

    #[test]
    fn test_parse_fetch_missing_dates() {
        assert!(matches!(
            Command::parse("/fetch AAPL 2020-01-01"),
            Err(PortfolioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_connect() {
        assert_eq!(
            Command::parse("/connect jdoe").unwrap(),
            Command::Connect {
                username: Some("jdoe".to_string())
            }
        );
        assert_eq!(
            Command::parse("/connect").unwrap(),
            Command::Connect { username: None }
        );
    }

    #[test]
    fn test_plain_text_is_question() {
        assert_eq!(
            Command::parse("  Which stock had the best Sharpe ratio? ").unwrap(),
            Command::Ask {
                question: "Which stock had the best Sharpe ratio?".to_string()
            }
        );
        assert_eq!(
            Command::parse("/ask what is the max drawdown").unwrap(),
            Command::Ask {
                question: "what is the max drawdown".to_string()
            }
        );
        assert!(Command::parse("/ask").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("/frontier").unwrap(), Command::Frontier);
        assert_eq!(Command::parse("/EF").unwrap(), Command::Frontier);
        assert_eq!(Command::parse("/sharpe").unwrap(), Command::Sharpe);
        assert_eq!(Command::parse("/returns").unwrap(), Command::Returns);
        assert_eq!(Command::parse("/status").unwrap(), Command::Status);
        assert_eq!(Command::parse("/?").unwrap(), Command::Help);
        assert_eq!(Command::parse("/quit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("   ").is_err());
        assert!(Command::parse("/").is_err());
        let err = Command::parse("/plot").unwrap_err();
        assert!(err.to_string().contains("unknown command: /plot"));
    }
}
