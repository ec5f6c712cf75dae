/*!
Modular output system for threat alerts
*/

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::monitor::{
    config::{OutputConfig, OutputPlugin, TerminalFormat},
    detection_engine::{ThreatAlert, ThreatKind},
    error::AsentryError,
};

/// Trait for output plugins
#[async_trait]
pub trait OutputHandler: Send {
    /// Name of the output handler
    fn name(&self) -> &'static str;

    /// Initialize the output handler (open files, clients, etc.)
    async fn initialize(&mut self) -> Result<(), AsentryError>;

    /// Report one new or increased threat
    async fn handle_alert(&mut self, alert: &ThreatAlert) -> Result<(), AsentryError>;

    /// Report that nothing changed since the last run
    async fn report_clear(&mut self) -> Result<(), AsentryError> {
        Ok(())
    }

    /// Cleanup/finalize the output handler
    async fn finalize(&mut self) -> Result<(), AsentryError> {
        Ok(())
    }
}

/// Manages multiple output handlers
pub struct OutputManager {
    handlers: Vec<Box<dyn OutputHandler>>,
}

impl OutputManager {
    pub fn new(configs: &[OutputConfig]) -> Self {
        let mut handlers: Vec<Box<dyn OutputHandler>> = Vec::new();

        for config in configs {
            if !config.enabled {
                continue;
            }

            let handler: Box<dyn OutputHandler> = match &config.plugin {
                OutputPlugin::Json { path, pretty } => {
                    Box::new(JsonOutputHandler::new(path.clone(), *pretty))
                }
                OutputPlugin::Webhook { url, auth_token } => {
                    Box::new(WebhookOutputHandler::new(url.clone(), auth_token.clone()))
                }
                OutputPlugin::Terminal { format } => Box::new(TerminalOutputHandler::new(*format)),
            };

            handlers.push(handler);
        }

        info!("Initialized output manager with {} handlers", handlers.len());
        Self { handlers }
    }

    /// Build from already constructed handlers.
    #[cfg(test)]
    pub fn with_handlers(handlers: Vec<Box<dyn OutputHandler>>) -> Self {
        Self { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Initialize all handlers, dropping any that cannot start.
    pub async fn initialize(&mut self) {
        let mut ready: Vec<Box<dyn OutputHandler>> = Vec::with_capacity(self.handlers.len());
        for mut handler in std::mem::take(&mut self.handlers) {
            match handler.initialize().await {
                Ok(()) => {
                    info!("Initialized output handler: {}", handler.name());
                    ready.push(handler);
                }
                Err(e) => error!("Output handler {} disabled: {}", handler.name(), e),
            }
        }
        self.handlers = ready;
    }

    /// Send every alert to all handlers.
    pub async fn announce(&mut self, alerts: &[ThreatAlert]) {
        for alert in alerts {
            for handler in &mut self.handlers {
                if let Err(e) = handler.handle_alert(alert).await {
                    error!(
                        "Handler {} failed to report {}: {}",
                        handler.name(),
                        alert.id,
                        e
                    );
                }
            }
        }
    }

    /// Tell all handlers that no threats changed.
    pub async fn report_clear(&mut self) {
        for handler in &mut self.handlers {
            if let Err(e) = handler.report_clear().await {
                error!("Handler {} failed to report all clear: {}", handler.name(), e);
            }
        }
    }

    /// Finalize all handlers
    pub async fn finalize(&mut self) {
        for handler in &mut self.handlers {
            if let Err(e) = handler.finalize().await {
                error!("Handler {} failed to finalize: {}", handler.name(), e);
            }
        }
    }
}

/// JSON-lines file output handler
pub struct JsonOutputHandler {
    file_path: PathBuf,
    pretty: bool,
    file: Option<std::fs::File>,
}

impl JsonOutputHandler {
    pub fn new(file_path: PathBuf, pretty: bool) -> Self {
        Self {
            file_path,
            pretty,
            file: None,
        }
    }
}

fn io_error(context: &str, path: &std::path::Path, e: std::io::Error) -> AsentryError {
    AsentryError::Other(format!("{} {}: {}", context, path.display(), e))
}

#[async_trait]
impl OutputHandler for JsonOutputHandler {
    fn name(&self) -> &'static str {
        "JSON"
    }

    async fn initialize(&mut self) -> Result<(), AsentryError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| io_error("cannot create", parent, e))?;
            }
        }
        self.file = Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)
                .map_err(|e| io_error("cannot open", &self.file_path, e))?,
        );
        Ok(())
    }

    async fn handle_alert(&mut self, alert: &ThreatAlert) -> Result<(), AsentryError> {
        if let Some(ref mut file) = self.file {
            let json_str = if self.pretty {
                serde_json::to_string_pretty(alert)
            } else {
                serde_json::to_string(alert)
            }
            .map_err(|e| AsentryError::Other(e.to_string()))?;

            writeln!(file, "{}", json_str)
                .and_then(|_| file.flush())
                .map_err(|e| io_error("cannot write", &self.file_path, e))?;
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<(), AsentryError> {
        if let Some(ref mut file) = self.file {
            file.flush()
                .map_err(|e| io_error("cannot flush", &self.file_path, e))?;
        }
        Ok(())
    }
}

/// Webhook output handler
pub struct WebhookOutputHandler {
    url: String,
    auth_token: Option<String>,
    client: Option<reqwest::Client>,
}

impl WebhookOutputHandler {
    pub fn new(url: String, auth_token: Option<String>) -> Self {
        Self {
            url,
            auth_token,
            client: None,
        }
    }
}

#[async_trait]
impl OutputHandler for WebhookOutputHandler {
    fn name(&self) -> &'static str {
        "Webhook"
    }

    async fn initialize(&mut self) -> Result<(), AsentryError> {
        self.client = Some(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
        );
        Ok(())
    }

    async fn handle_alert(&mut self, alert: &ThreatAlert) -> Result<(), AsentryError> {
        let Some(client) = &self.client else {
            return Ok(());
        };
        let mut request = client.post(&self.url);

        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.json(alert).send().await?;

        if !response.status().is_success() {
            return Err(AsentryError::Other(format!(
                "webhook delivery failed: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Terminal output handler
pub struct TerminalOutputHandler {
    format: TerminalFormat,
}

impl TerminalOutputHandler {
    pub fn new(format: TerminalFormat) -> Self {
        Self { format }
    }

    fn format_alert(&self, alert: &ThreatAlert) -> String {
        let kind = match alert.kind {
            ThreatKind::New => "New",
            ThreatKind::Increased => "Increased",
        };
        let torino = alert
            .ts_max
            .as_ref()
            .map(|s| s.as_str())
            .unwrap_or("none");

        match self.format {
            TerminalFormat::Plain => format!(
                "WARNING: {} threat: {}\n\
                 Impact date {}, Palermo = {}, Torino = {}\n\
                 Details: {}\n",
                kind, alert.name, alert.impact_range, alert.ps_cum, torino, alert.details_url
            ),
            TerminalFormat::Colored => format!(
                "\x1b[31mWARNING: {} threat:\x1b[0m \x1b[1m{}\x1b[0m\n\
                 \x1b[36mImpact date\x1b[0m {}, \x1b[36mPalermo =\x1b[0m {}, \x1b[36mTorino =\x1b[0m {}\n\
                 \x1b[36mDetails:\x1b[0m {}\n",
                kind, alert.name, alert.impact_range, alert.ps_cum, torino, alert.details_url
            ),
            TerminalFormat::Json => serde_json::to_string_pretty(alert)
                .unwrap_or_else(|_| "JSON serialization failed".to_string()),
        }
    }
}

#[async_trait]
impl OutputHandler for TerminalOutputHandler {
    fn name(&self) -> &'static str {
        "Terminal"
    }

    async fn initialize(&mut self) -> Result<(), AsentryError> {
        Ok(())
    }

    async fn handle_alert(&mut self, alert: &ThreatAlert) -> Result<(), AsentryError> {
        println!("{}", self.format_alert(alert));
        Ok(())
    }

    async fn report_clear(&mut self) -> Result<(), AsentryError> {
        match self.format {
            TerminalFormat::Colored => println!("\x1b[32mNo new threats\x1b[0m"),
            _ => println!("No new threats"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::config::SourceConfig;
    use crate::monitor::detection_engine::DetectionEngine;
    use sentry_data::{Snapshot, TrackedObject};

    fn tl4_alert() -> ThreatAlert {
        let object: TrackedObject = serde_json::from_value(serde_json::json!({
            "id": "bK23T04L", "fullname": "(2023 TL4)", "des": "2023 TL4",
            "range": "2119-2121", "ps_cum": "-1.77", "ts_max": "1"
        }))
        .unwrap();
        DetectionEngine::new(&SourceConfig::default())
            .unwrap()
            .compare(&Snapshot::new(), &[object])
            .alerts
            .remove(0)
    }

    #[test]
    fn plain_format_matches_report_layout() {
        let text = TerminalOutputHandler::new(TerminalFormat::Plain).format_alert(&tl4_alert());
        assert_eq!(
            text,
            "WARNING: New threat: (2023 TL4)\n\
             Impact date 2119-2121, Palermo = -1.77, Torino = 1\n\
             Details: https://cneos.jpl.nasa.gov/sentry/details.html#?des=2023%20TL4\n"
        );
    }

    #[test]
    fn unrated_torino_prints_none() {
        let mut alert = tl4_alert();
        alert.ts_max = None;
        let text = TerminalOutputHandler::new(TerminalFormat::Plain).format_alert(&alert);
        assert!(text.contains("Torino = none"));
    }

    #[test]
    fn json_format_is_valid_json() {
        let text = TerminalOutputHandler::new(TerminalFormat::Json).format_alert(&tl4_alert());
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "New");
        assert_eq!(value["ps_cum"], "-1.77");
    }

    #[tokio::test]
    async fn json_handler_appends_one_line_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("alerts.jsonl");
        let mut manager = OutputManager::new(&[OutputConfig {
            plugin: OutputPlugin::Json {
                path: path.clone(),
                pretty: false,
            },
            enabled: true,
        }]);

        manager.initialize().await;
        manager.announce(&[tl4_alert(), tl4_alert()]).await;
        manager.finalize().await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "bK23T04L");
    }

    #[tokio::test]
    async fn disabled_outputs_are_skipped() {
        let manager = OutputManager::new(&[OutputConfig {
            plugin: OutputPlugin::Terminal {
                format: TerminalFormat::Plain,
            },
            enabled: false,
        }]);
        assert_eq!(manager.len(), 0);
    }

    #[tokio::test]
    async fn handler_that_cannot_start_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let mut manager = OutputManager::new(&[
            OutputConfig {
                plugin: OutputPlugin::Json {
                    path: blocker.join("alerts.jsonl"),
                    pretty: false,
                },
                enabled: true,
            },
            OutputConfig::default(),
        ]);
        manager.initialize().await;
        assert_eq!(manager.len(), 1);
    }
}
