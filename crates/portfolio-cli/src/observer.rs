//! Console "thinking" log for the assistant

use std::io::{self, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use portfolio_agent::AgentObserver;
use serde_json::Value;

const MAX_DETAIL_CHARS: usize = 160;

/// Prints agent progress as indented lines
pub struct ConsoleObserver<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleObserver<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn line(&self, text: &str) {
        // A broken console must not abort the agent
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "  {text}");
            let _ = out.flush();
        }
    }
}

#[async_trait]
impl<W: Write + Send> AgentObserver for ConsoleObserver<W> {
    async fn on_question(&self, _question: &str) {
        self.line("thinking...");
    }

    async fn on_thought(&self, text: &str) {
        self.line(&format!("· {}", clip(text)));
    }

    async fn on_tool_start(&self, name: &str, input: &Value) {
        let args = match input {
            Value::Object(map) if map.is_empty() => String::new(),
            Value::Null => String::new(),
            other => format!(" {}", clip(&other.to_string())),
        };
        self.line(&format!("→ {name}{args}"));
    }

    async fn on_tool_done(&self, name: &str, output: Result<&Value, &str>, duration_ms: u64) {
        match output {
            Ok(_) => self.line(&format!("← {name} done ({duration_ms} ms)")),
            Err(e) => self.line(&format!("← {name} failed: {}", clip(e))),
        }
    }

    async fn on_error(&self, error: &str) {
        self.line(&format!("stopped: {}", clip(error)));
    }
}

fn clip(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_thinking_log() {
        let observer = ConsoleObserver::new(Vec::new());
        observer.on_question("Show the frontier").await;
        observer.on_thought("Let me plot it.").await;
        observer.on_tool_start("plot_efficient_frontier", &json!({})).await;
        observer
            .on_tool_done("plot_efficient_frontier", Ok(&json!({"status": "ok"})), 12)
            .await;
        observer
            .on_tool_start("return_table", &json!({"view": "rows"}))
            .await;
        observer.on_tool_done("return_table", Err("bad view"), 1).await;

        let text = String::from_utf8(observer.out.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "  thinking...",
                "  · Let me plot it.",
                "  → plot_efficient_frontier",
                "  ← plot_efficient_frontier done (12 ms)",
                "  → return_table {\"view\":\"rows\"}",
                "  ← return_table failed: bad view",
            ]
        );
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("  short "), "short");
        let long = "x".repeat(MAX_DETAIL_CHARS + 10);
        assert_eq!(clip(&long).chars().count(), MAX_DETAIL_CHARS + 1);
    }
}
