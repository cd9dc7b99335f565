//! Scripted in-memory prediction API for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::PredictionApi;
use crate::error::{GenerationError, GenerationResult};
use crate::models::{GenerationRequest, PredictionResponse};

pub struct ScriptedApi {
    create: Mutex<Option<GenerationResult<PredictionResponse>>>,
    polls: Mutex<VecDeque<PredictionResponse>>,
    repeat_last: Mutex<Option<PredictionResponse>>,
    output: Mutex<Option<GenerationResult<Vec<u8>>>>,
    pub last_request: Mutex<Option<GenerationRequest>>,
    pub create_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

pub fn prediction(value: serde_json::Value) -> PredictionResponse {
    serde_json::from_value(value).expect("valid prediction fixture")
}

pub fn created() -> PredictionResponse {
    prediction(json!({
        "id": "job-1",
        "status": "starting",
        "urls": {"get": "https://api.test/v1/predictions/job-1"}
    }))
}

pub fn status(status: &str) -> PredictionResponse {
    prediction(json!({"id": "job-1", "status": status}))
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            create: Mutex::new(Some(Ok(created()))),
            polls: Mutex::new(VecDeque::new()),
            repeat_last: Mutex::new(None),
            output: Mutex::new(None),
            last_request: Mutex::new(None),
            create_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_create(self, result: GenerationResult<PredictionResponse>) -> Self {
        *self.create.lock().unwrap() = Some(result);
        self
    }

    pub fn then_poll(self, response: PredictionResponse) -> Self {
        self.polls.lock().unwrap().push_back(response);
        self
    }

    /// Answers every poll past the script with `response`.
    pub fn forever(self, response: PredictionResponse) -> Self {
        *self.repeat_last.lock().unwrap() = Some(response);
        self
    }

    pub fn with_output(self, result: GenerationResult<Vec<u8>>) -> Self {
        *self.output.lock().unwrap() = Some(result);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.poll_calls.load(Ordering::SeqCst)
            + self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PredictionApi for ScriptedApi {
    async fn create_prediction(
        &self,
        request: &GenerationRequest,
    ) -> GenerationResult<PredictionResponse> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.create
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(GenerationError::SubmissionError("script exhausted".into())))
    }

    async fn get_prediction(&self, _poll_url: &str) -> GenerationResult<PredictionResponse> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.polls.lock().unwrap().pop_front() {
            return Ok(next);
        }
        self.repeat_last
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| GenerationError::TransportError("poll script exhausted".into()))
    }

    async fn fetch_output(&self, _url: &str) -> GenerationResult<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.output
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(GenerationError::TransportError("404 Not Found".into())))
    }
}
