//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use svc_lifecycle::{Component, ComponentError, Context};

/// Ordered record of lifecycle calls across components.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// What a recording component does when started.
#[derive(Clone, Copy, Debug)]
pub enum OnStart {
    /// Return immediately.
    Succeed,
    /// Return an error.
    Fail,
    /// Ask the bound service to exit with the code, then return.
    Exit(i32),
}

/// A component appending `<name>.<phase>` to a [`Recorder`].
pub struct Recording {
    name: String,
    recorder: Recorder,
    on_start: OnStart,
    stop_delay: Option<Duration>,
}

impl Recording {
    pub fn new(name: &str, recorder: &Recorder) -> Self {
        Self {
            name: name.to_string(),
            recorder: recorder.clone(),
            on_start: OnStart::Succeed,
            stop_delay: None,
        }
    }

    pub fn on_start(mut self, on_start: OnStart) -> Self {
        self.on_start = on_start;
        self
    }

    /// Make `stop` hang for `delay` before returning.
    pub fn stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }
}

#[async_trait]
impl Component for Recording {
    async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        self.recorder.record(format!("{}.start", self.name));
        match self.on_start {
            OnStart::Succeed => Ok(()),
            OnStart::Fail => Err(ComponentError::msg(format!("{} refused to start", self.name))),
            OnStart::Exit(code) => {
                if let Some(service) = ctx.service() {
                    service.exit(code).await;
                }
                Ok(())
            }
        }
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        self.recorder.record(format!("{}.stop", self.name));
        Ok(())
    }

    async fn kill(&self) -> Result<(), ComponentError> {
        self.recorder.record(format!("{}.kill", self.name));
        Ok(())
    }
}

pub fn entries(list: &[&str]) -> Vec<String> {
    list.iter().map(|entry| entry.to_string()).collect()
}
