//! In-memory stand-in for the translations backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use autonews::api::{
    InboxPage, InboxQuery, NewTranslationRecord, SlackReport, StepRequest, TranslationApi,
};
use autonews::{ApiError, RecordStatus, TranslationRecord};

/// One request received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    ListInbox(InboxQuery),
    FetchRecord(u64),
    CreateRecord(NewTranslationRecord),
    UpdateStatus(u64, RecordStatus),
    Prepare(StepRequest),
    Primary(StepRequest),
    Revision(StepRequest),
    SendReport(SlackReport),
}

impl ApiCall {
    /// Prompt id for step calls.
    pub fn prompt_id(&self) -> Option<u32> {
        match self {
            ApiCall::Prepare(r) | ApiCall::Primary(r) | ApiCall::Revision(r) => {
                Some(r.gpt_prompt_id)
            }
            _ => None,
        }
    }
}

fn server_error(body: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        body: body.to_string(),
    }
}

#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<ApiCall>>,
    records: Mutex<HashMap<u64, TranslationRecord>>,
    step_responses: Mutex<HashMap<u32, Value>>,
    failing_prompts: Mutex<HashSet<u32>>,
    failing_statuses: Mutex<HashSet<RecordStatus>>,
    fail_reports: AtomicBool,
    create_response: Mutex<Option<Value>>,
    inbox: Mutex<Option<InboxPage>>,
    step_delay: Mutex<Option<Duration>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: TranslationRecord) -> Self {
        self.records.lock().unwrap().insert(record.id, record);
        self
    }

    /// Response returned by the step bound to `prompt_id`.
    pub fn respond(self, prompt_id: u32, response: Value) -> Self {
        self.step_responses
            .lock()
            .unwrap()
            .insert(prompt_id, response);
        self
    }

    pub fn fail_prompt(self, prompt_id: u32) -> Self {
        self.failing_prompts.lock().unwrap().insert(prompt_id);
        self
    }

    pub fn fail_status(self, status: RecordStatus) -> Self {
        self.failing_statuses.lock().unwrap().insert(status);
        self
    }

    pub fn fail_reports(self) -> Self {
        self.fail_reports.store(true, Ordering::SeqCst);
        self
    }

    pub fn on_create(self, response: Value) -> Self {
        *self.create_response.lock().unwrap() = Some(response);
        self
    }

    pub fn with_inbox(self, page: InboxPage) -> Self {
        *self.inbox.lock().unwrap() = Some(page);
        self
    }

    /// Makes every step call take `delay` before answering.
    pub fn with_step_delay(self, delay: Duration) -> Self {
        *self.step_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn step_prompts(&self) -> Vec<u32> {
        self.calls().iter().filter_map(ApiCall::prompt_id).collect()
    }

    pub fn status_updates(&self, id: u64) -> Vec<RecordStatus> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::UpdateStatus(record_id, status) if record_id == id => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn fetches(&self, id: u64) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == ApiCall::FetchRecord(id))
            .count()
    }

    pub fn reports(&self) -> Vec<SlackReport> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::SendReport(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn step(&self, call: ApiCall, request: &StepRequest) -> Result<Value, ApiError> {
        self.record(call);

        let delay = *self.step_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self
            .failing_prompts
            .lock()
            .unwrap()
            .contains(&request.gpt_prompt_id)
        {
            return Err(server_error("model unavailable"));
        }

        Ok(self
            .step_responses
            .lock()
            .unwrap()
            .get(&request.gpt_prompt_id)
            .cloned()
            .unwrap_or_else(|| json!({"status": "ok"})))
    }
}

#[async_trait]
impl TranslationApi for MockApi {
    async fn list_inbox(&self, query: &InboxQuery) -> Result<InboxPage, ApiError> {
        self.record(ApiCall::ListInbox(query.clone()));
        Ok(self.inbox.lock().unwrap().clone().unwrap_or(InboxPage {
            records: Vec::new(),
            total_pages: 1,
            total_count: 0,
        }))
    }

    async fn fetch_record(&self, id: u64) -> Result<TranslationRecord, ApiError> {
        self.record(ApiCall::FetchRecord(id));
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                body: "Not Found".to_string(),
            })
    }

    async fn create_record(&self, record: &NewTranslationRecord) -> Result<Value, ApiError> {
        self.record(ApiCall::CreateRecord(record.clone()));
        Ok(self
            .create_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(json!({"ok": true})))
    }

    async fn update_status(&self, id: u64, status: RecordStatus) -> Result<Value, ApiError> {
        self.record(ApiCall::UpdateStatus(id, status));
        if self.failing_statuses.lock().unwrap().contains(&status) {
            return Err(server_error("status rejected"));
        }
        if let Some(record) = self.records.lock().unwrap().get_mut(&id) {
            record.status = status;
        }
        Ok(json!({"id": id, "status": status}))
    }

    async fn prepare(&self, request: &StepRequest) -> Result<Value, ApiError> {
        self.step(ApiCall::Prepare(request.clone()), request).await
    }

    async fn primary(&self, request: &StepRequest) -> Result<Value, ApiError> {
        self.step(ApiCall::Primary(request.clone()), request).await
    }

    async fn revision(&self, request: &StepRequest) -> Result<Value, ApiError> {
        self.step(ApiCall::Revision(request.clone()), request).await
    }

    async fn send_report(&self, report: &SlackReport) -> Result<Value, ApiError> {
        self.record(ApiCall::SendReport(report.clone()));
        if self.fail_reports.load(Ordering::SeqCst) {
            return Err(server_error("slack down"));
        }
        Ok(json!({"ok": true}))
    }
}
