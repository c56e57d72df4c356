//! Mock hosted service.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use recording_bot::configuration::BotConfiguration;
use recording_bot::errors::BotError;
use recording_bot::service::BotService;

/// Calls seen by a [`MockBotService`].
#[derive(Debug, Default)]
pub struct ServiceCalls {
    pub initialize: usize,
    pub start: usize,
    pub stop: usize,
    /// Configuration passed to the last `initialize`.
    pub config: Option<BotConfiguration>,
}

/// `BotService` that records calls and fails on request.
#[derive(Debug, Clone, Default)]
pub struct MockBotService {
    calls: Arc<Mutex<ServiceCalls>>,
    fail_initialize: bool,
    fail_start: bool,
}

impl MockBotService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `initialize` with a service error.
    #[must_use]
    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Fail `start` with a service error.
    #[must_use]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Shared view of the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Arc<Mutex<ServiceCalls>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl BotService for MockBotService {
    async fn initialize(&mut self, config: BotConfiguration) -> Result<(), BotError> {
        let mut calls = self.calls.lock().unwrap();
        calls.initialize += 1;
        calls.config = Some(config);
        if self.fail_initialize {
            return Err(BotError::Service("mock initialize failure".to_string()));
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<(), BotError> {
        self.calls.lock().unwrap().start += 1;
        if self.fail_start {
            return Err(BotError::Service("mock start failure".to_string()));
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BotError> {
        self.calls.lock().unwrap().stop += 1;
        Ok(())
    }
}
