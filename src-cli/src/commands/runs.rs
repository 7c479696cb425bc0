//! Starting, resuming and inspecting pipeline runs.
//!
//! Commands that follow runs first restart whatever a previous process left
//! `running`, then handle the request itself.

use anyhow::Result;
use tokio::sync::broadcast::Receiver;

use autonews::{ProcessingEvent, RunHandle, RunOptions, RunTarget};

use super::report_outcomes;
use crate::events::{describe, follow};
use crate::state::AppState;

pub async fn run(app: &AppState, id: u64, language: Option<String>) -> Result<()> {
    let events = app.store.subscribe();
    let mut handles = app.resume_interrupted();

    if is_resuming(&handles, id) {
        println!("#{} continues its interrupted run", id);
    } else {
        handles.push(
            app.orchestrator()
                .spawn(RunTarget::Id(id), RunOptions { language }),
        );
    }

    follow_and_report(app, events, handles).await
}

pub async fn retranslate(app: &AppState, id: u64, language: Option<String>) -> Result<()> {
    let events = app.store.subscribe();
    let mut handles = app.resume_interrupted();

    if is_resuming(&handles, id) {
        println!("#{} continues its interrupted run", id);
    } else {
        handles.push(app.inbox.retranslate(id, language.as_deref()).await?);
    }

    follow_and_report(app, events, handles).await
}

pub async fn resume(app: &AppState) -> Result<()> {
    let events = app.store.subscribe();
    let handles = app.resume_interrupted();
    if handles.is_empty() {
        println!("Nothing to resume");
        return Ok(());
    }

    follow_and_report(app, events, handles).await
}

pub fn status(app: &AppState) -> Result<()> {
    let entries = app.store.snapshot();
    if entries.is_empty() {
        println!("No translations in progress");
        return Ok(());
    }

    let threshold = app.long_run_threshold();
    for (id, entry) in &entries {
        println!("#{} {}", id, describe(entry, threshold));
    }
    Ok(())
}

fn is_resuming(handles: &[RunHandle], id: u64) -> bool {
    handles.iter().any(|handle| handle.record_id() == id)
}

pub(crate) async fn follow_and_report(
    app: &AppState,
    events: Receiver<ProcessingEvent>,
    handles: Vec<RunHandle>,
) -> Result<()> {
    let ids: Vec<u64> = handles.iter().map(RunHandle::record_id).collect();
    let outcomes = follow(events, handles, app.long_run_threshold()).await;
    report_outcomes(&ids, &outcomes)
}
