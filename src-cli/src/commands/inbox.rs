//! Inbox browsing and record creation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::fs;

use autonews::{InboxService, RecordDraft};

use super::runs::follow_and_report;
use crate::events::describe;
use crate::state::AppState;

pub async fn list(app: &AppState, page: u32, page_size: u32) -> Result<()> {
    let result = app.inbox.list(page, page_size).await?;

    println!(
        "Page {}/{} ({} records)",
        page.max(1),
        result.total_pages,
        result.total_count
    );
    for record in &result.records {
        let entry = app.store.get(record.id);
        let status = InboxService::effective_status(record, entry.as_ref());
        println!(
            "{:>8}  {:<16}  {}",
            record.id,
            status.as_str(),
            record.title_or_snippet()
        );
    }
    Ok(())
}

pub async fn show(app: &AppState, id: u64) -> Result<()> {
    let record = app.inbox.get(id).await?;
    let entry = app.store.get(id);

    println!("{}", serde_json::to_string_pretty(&record)?);
    match &entry {
        Some(entry) => println!("Processing: {}", describe(entry, app.long_run_threshold())),
        None if InboxService::can_start(&record, None) => println!("Processing: idle"),
        None => println!("Processing: not tracked by this machine"),
    }
    Ok(())
}

pub async fn create(
    app: &AppState,
    body: Option<String>,
    file: Option<PathBuf>,
    notes: Option<String>,
    translate: Option<String>,
) -> Result<()> {
    let body_raw = match (body, file) {
        (Some(body), _) => body,
        (None, Some(path)) => fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?,
        (None, None) => bail!("Either --body or --file is required"),
    };

    let events = app.store.subscribe();
    let created = app
        .inbox
        .create(RecordDraft { body_raw, notes }, translate.as_deref())
        .await?;

    match created.id {
        Some(id) => println!("Created record #{}", id),
        None => println!("Created record (the backend did not return an id)"),
    }

    let Some(run) = created.run else {
        return Ok(());
    };

    let mut handles = app.resume_interrupted();
    handles.push(run);
    follow_and_report(app, events, handles).await
}
