//! Shared test utilities for code that talks to an [`AiClient`].

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::{AiClient, AiClientMetadata};

/// Mock client replaying a queue of streamed responses.
///
/// Each queued response is either the list of fragments to stream or an
/// error. Once the queue is exhausted every call fails with
/// "no more mock responses". Prompts are recorded; read them through
/// [`prompt_handle`](Self::prompt_handle).
pub(crate) struct StreamingMockAiClient {
    responses: Arc<Mutex<VecDeque<Result<Vec<String>>>>>,
    recorded_prompts: Arc<Mutex<Vec<String>>>,
}

impl StreamingMockAiClient {
    pub(crate) fn new(responses: Vec<Result<Vec<&str>>>) -> Self {
        let responses = responses
            .into_iter()
            .map(|response| response.map(|parts| parts.into_iter().map(str::to_string).collect()))
            .collect();
        Self {
            responses: Arc::new(Mutex::new(responses)),
            recorded_prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn prompt_handle(&self) -> PromptRecordHandle {
        PromptRecordHandle {
            recorded_prompts: self.recorded_prompts.clone(),
        }
    }
}

/// Shared handle to a mock client's recorded prompts.
pub(crate) struct PromptRecordHandle {
    recorded_prompts: Arc<Mutex<Vec<String>>>,
}

impl PromptRecordHandle {
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.recorded_prompts.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.recorded_prompts.lock().unwrap().len()
    }
}

impl AiClient for StreamingMockAiClient {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        on_fragment: &'a mut (dyn FnMut(&str) + Send),
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            self.recorded_prompts.lock().unwrap().push(prompt.to_string());
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no more mock responses")));

            let fragments = next?;
            let mut text = String::new();
            for fragment in &fragments {
                on_fragment(fragment);
                text.push_str(fragment);
            }
            Ok(text)
        })
    }

    fn get_metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: "Mock".to_string(),
            model: "mock-model".to_string(),
        }
    }
}
