//! Payload delivery
//!
//! The exporter only builds payloads. Delivery belongs to a `Transport`:
//! a terminal table for debug runs, or a form POST to the hosting survey
//! platform. Failures are returned as-is and never retried here;
//! `deliver_or_keep` writes the payload somewhere durable first.

use std::io::Write;

use colored::Colorize;
use tracing::{info, warn};

use crate::core::export::{parse_table, ExportPayload};
use crate::types::TransportError;

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn deliver(&self, payload: &ExportPayload) -> Result<(), TransportError>;
}

/// Deliver, and on failure write the payload as JSON to `fallback` before
/// returning the delivery error
pub async fn deliver_or_keep<T, W>(
    transport: &T,
    payload: &ExportPayload,
    fallback: &mut W,
) -> Result<(), TransportError>
where
    T: Transport,
    W: Write,
{
    let err = match transport.deliver(payload).await {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    warn!(session = %payload.session_id, error = %err, "delivery failed, keeping payload");

    serde_json::to_writer_pretty(&mut *fallback, payload).map_err(std::io::Error::from)?;
    writeln!(fallback)?;
    fallback.flush()?;
    Err(err)
}

// =============================================================================
// RENDER (debug mode)
// =============================================================================

/// Prints the payload as a coloured table
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderTransport;

impl RenderTransport {
    pub fn new() -> Self {
        Self
    }

    /// Table text as printed, without writing it
    pub fn render(&self, payload: &ExportPayload) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", format!("Session {}", payload.session_id).bold()));

        match parse_table(&payload.table) {
            Ok(rows) => {
                out.push_str(&format!(
                    "{}\n",
                    format!(
                        "{:<9} {:>5}  {:<44} {:>3} {:>6} {:>7}",
                        "block", "index", "stimulus", "key", "rt_ms", "correct"
                    )
                    .dimmed()
                ));
                for row in rows {
                    let correct = match row.correct {
                        Some(true) => "yes".green().to_string(),
                        Some(false) => "no".red().to_string(),
                        None => "-".dimmed().to_string(),
                    };
                    out.push_str(&format!(
                        "{:<9} {:>5}  {:<44} {:>3} {:>6} {:>7}\n",
                        row.block.as_str(),
                        row.index,
                        row.stimulus,
                        row.response_key.map(String::from).unwrap_or_default(),
                        row.rt_ms.map(|rt| rt.to_string()).unwrap_or_else(|| "-".to_string()),
                        correct,
                    ));
                }
            }
            Err(_) => out.push_str(&payload.table),
        }

        let summary = &payload.summary;
        out.push_str(&format!(
            "practice accuracy: {}  main trials: {}  mean rt: {}\n",
            summary
                .practice_accuracy
                .map(|a| format!("{:.0}%", a * 100.0))
                .unwrap_or_else(|| "-".to_string()),
            summary.main_trial_count,
            summary
                .mean_main_rt_ms
                .map(|rt| format!("{:.0} ms", rt))
                .unwrap_or_else(|| "-".to_string()),
        ));
        out.push_str(&format!("{}\n", format!("sha256 {}", payload.checksum).dimmed()));
        out
    }
}

impl Transport for RenderTransport {
    async fn deliver(&self, payload: &ExportPayload) -> Result<(), TransportError> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(self.render(payload).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

// =============================================================================
// FORM POST (embedded mode)
// =============================================================================

/// POSTs the payload's form fields to the survey platform
#[derive(Debug, Clone)]
pub struct FormPostTransport {
    client: reqwest::Client,
    url: String,
    max_field_len: usize,
}

impl FormPostTransport {
    pub fn new(url: impl Into<String>, max_field_len: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            max_field_len,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for FormPostTransport {
    async fn deliver(&self, payload: &ExportPayload) -> Result<(), TransportError> {
        let fields = payload.to_form_fields(self.max_field_len);
        let response = self.client.post(&self.url).form(&fields).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected(status.as_u16()));
        }
        info!(url = %self.url, fields = fields.len(), "payload submitted");
        Ok(())
    }
}
