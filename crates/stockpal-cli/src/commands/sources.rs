use serde::Serialize;
use stockpal_core::{HealthState, ProviderId, QuoteFetcher};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceStatus {
    id: ProviderId,
    available: bool,
    status: &'static str,
    capabilities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceStatus>,
}

pub async fn run(fetcher: &QuoteFetcher) -> Result<CommandResult, CliError> {
    let sources = fetcher
        .snapshots()
        .await
        .into_iter()
        .map(|snapshot| SourceStatus {
            id: snapshot.id,
            available: snapshot.health.state != HealthState::Unhealthy && snapshot.health.rate_available,
            status: snapshot.status_label(),
            capabilities: snapshot.capabilities.supported(),
        })
        .collect::<Vec<_>>();

    let data = serde_json::to_value(SourcesResponseData { sources })?;
    Ok(CommandResult::ok(data, fetcher.source_ids()))
}
