//! Read-only views over the ledger, tags and execution logs.

use super::open_store;
use crate::cli::{ChunksArgs, EventsArgs, RunsArgs, TagsArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use clinitag_domain::traits::{ChunkLedger, DocumentStore, ExecutionLogStore, TagStore};
use clinitag_domain::RunId;

/// Execute the chunks command.
pub fn execute_chunks(args: ChunksArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = open_store(config)?;
    let document = store
        .find_document(&args.document)?
        .ok_or_else(|| CliError::NotFound(format!("document {}", args.document)))?;

    let mut chunks = store.list_chunks(document.id)?;
    if args.pending {
        chunks.retain(|c| !c.processed);
    }
    println!("{}", formatter.format_chunks(&chunks)?);
    Ok(())
}

/// Execute the tags command.
pub fn execute_tags(args: TagsArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = open_store(config)?;

    let tags = match args.name {
        Some(name) => {
            let tag = store
                .find_tag(&name)?
                .ok_or_else(|| CliError::NotFound(format!("tag {}", name)))?;
            vec![tag]
        }
        None => store.list_tags(args.category.as_deref())?,
    };

    let mut rows = Vec::with_capacity(tags.len());
    for tag in tags {
        let conditions = store.conditions_for(tag.id)?;
        rows.push((tag, conditions));
    }
    println!("{}", formatter.format_tags(&rows)?);
    Ok(())
}

/// Execute the runs command.
pub fn execute_runs(args: RunsArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    if args.limit == 0 {
        return Err(CliError::InvalidInput("Limit must be at least 1".to_string()));
    }
    let store = open_store(config)?;
    let logs = store.recent_logs(args.limit)?;
    println!("{}", formatter.format_logs(&logs)?);
    Ok(())
}

/// Execute the events command.
pub fn execute_events(args: EventsArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let run = RunId::from_string(&args.run_id).map_err(CliError::InvalidInput)?;
    let store = open_store(config)?;
    let log = store
        .get_log(run)?
        .ok_or_else(|| CliError::NotFound(format!("run {}", args.run_id)))?;

    let events = store.events_for(log.id)?;
    println!("{}", formatter.format_events(&events)?);
    Ok(())
}
