use serde_json::Value;
use stockpal_core::Envelope;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(envelope: &Envelope<Value>, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => print!("{}", render_table(envelope)?),
    }

    Ok(())
}

/// Markdown `display` text when the command produced one, pretty JSON
/// otherwise, followed by the envelope metadata.
fn render_table(envelope: &Envelope<Value>) -> Result<String, CliError> {
    let mut out = String::new();

    match envelope.data.get("display").and_then(Value::as_str) {
        Some(display) => {
            out.push_str(display);
            out.push('\n');
        }
        None => {
            out.push_str(&serde_json::to_string_pretty(&envelope.data)?);
            out.push('\n');
        }
    }

    out.push('\n');
    out.push_str(&format!("request_id  : {}\n", envelope.meta.request_id));
    out.push_str(&format!("generated_at: {}\n", envelope.meta.generated_at));
    out.push_str(&format!(
        "sources     : {}\n",
        envelope
            .meta
            .source_chain
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(",")
    ));
    out.push_str(&format!("latency_ms  : {}\n", envelope.meta.latency_ms));
    out.push_str(&format!("cache_hit   : {}\n", envelope.meta.cache_hit));

    if !envelope.meta.warnings.is_empty() {
        out.push_str("warnings:\n");
        for warning in &envelope.meta.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }

    if !envelope.errors.is_empty() {
        out.push_str("errors:\n");
        for error in &envelope.errors {
            match error.source {
                Some(source) => out.push_str(&format!("  - [{source}] {}: {}\n", error.code, error.message)),
                None => out.push_str(&format!("  - {}: {}\n", error.code, error.message)),
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stockpal_core::{EnvelopeError, EnvelopeMeta, ProviderId};

    use super::*;

    fn envelope(data: Value) -> Envelope<Value> {
        let meta = EnvelopeMeta::new("123e4567-e89b-42d3-a456-426614174000", vec![ProviderId::Sina], 7, false)
            .expect("meta");
        let error = EnvelopeError::new("source.unavailable", "timed out")
            .expect("error")
            .with_source(ProviderId::Sina);
        Envelope::with_errors(meta, data, vec![error]).expect("envelope")
    }

    #[test]
    fn table_prefers_display_text() {
        let rendered = render_table(&envelope(json!({ "display": "**贵州茅台 (600519)**" }))).expect("table");

        assert!(rendered.starts_with("**贵州茅台 (600519)**\n"));
        assert!(rendered.contains("sources     : sina"));
        assert!(rendered.contains("  - [sina] source.unavailable: timed out"));
    }

    #[test]
    fn table_falls_back_to_pretty_json() {
        let rendered = render_table(&envelope(json!({ "ticker": "AAPL" }))).expect("table");
        assert!(rendered.starts_with("{\n  \"ticker\": \"AAPL\"\n}"));
    }
}
