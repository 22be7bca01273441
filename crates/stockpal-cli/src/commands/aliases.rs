use serde::Serialize;
use stockpal_core::{Alias, QuoteFetcher};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct AliasesResponseData<'a> {
    count: usize,
    aliases: &'a [Alias],
}

pub fn run(fetcher: &QuoteFetcher) -> Result<CommandResult, CliError> {
    let aliases = fetcher.resolver().aliases();
    let data = serde_json::to_value(AliasesResponseData {
        count: aliases.len(),
        aliases,
    })?;

    Ok(CommandResult::ok(data, fetcher.source_ids()))
}
