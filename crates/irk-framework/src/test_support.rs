//! Mock bot and handlers shared by the unit tests of this crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use irk_core::{AdminRequest, ApiResult, Bot, BoxError, EventClass};

use crate::context::Context;
use crate::handler::{Handler, Payload};

/// A bot that records every outbound line and admin request.
#[derive(Default)]
pub struct RecordingBot {
    lines: Mutex<Vec<String>>,
    admin: Mutex<Vec<AdminRequest>>,
}

impl RecordingBot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn admin_requests(&self) -> Vec<AdminRequest> {
        self.admin.lock().clone()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    fn nick(&self) -> &str {
        "irk"
    }

    async fn send_raw(&self, line: &str) -> ApiResult<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn request_admin(&self, request: AdminRequest) -> ApiResult<()> {
        self.admin.lock().push(request);
        Ok(())
    }
}

/// Ordered record of handler invocations across several handlers.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// A handler that counts its runs and unloads.
pub struct Counting {
    label: String,
    rule: String,
    class: EventClass,
    runs: AtomicUsize,
    unloads: AtomicUsize,
    journal: Option<Journal>,
}

impl Counting {
    /// A message handler whose label is its rule.
    pub fn new(rule: &str) -> Arc<Self> {
        Arc::new(Self::build(rule, rule, EventClass::Message, None))
    }

    pub fn shared(rule: &str) -> Arc<dyn Handler> {
        Self::new(rule)
    }

    /// A handler that appends `label` to `journal` on every run.
    pub fn labelled(label: &str, rule: &str, class: EventClass, journal: &Journal) -> Arc<Self> {
        Arc::new(Self::build(label, rule, class, Some(journal.clone())))
    }

    pub fn build(label: &str, rule: &str, class: EventClass, journal: Option<Journal>) -> Self {
        Self {
            label: label.to_string(),
            rule: rule.to_string(),
            class,
            runs: AtomicUsize::new(0),
            unloads: AtomicUsize::new(0),
            journal,
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for Counting {
    fn rule(&self) -> &str {
        &self.rule
    }

    fn handler_type(&self) -> EventClass {
        self.class
    }

    async fn run(&self, _ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal.lock().push(self.label.clone());
        }
        Ok(())
    }

    async fn unload(&self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
    }
}

/// Same behaviour as [`Counting`] under a different type name.
pub struct Other(Counting);

impl Other {
    pub fn new(rule: &str) -> Arc<Self> {
        Arc::new(Self(Counting::build(rule, rule, EventClass::Message, None)))
    }

    pub fn unloads(&self) -> usize {
        self.0.unloads()
    }
}

#[async_trait]
impl Handler for Other {
    fn rule(&self) -> &str {
        self.0.rule()
    }

    async fn run(&self, ctx: &Context, payload: Payload<'_>) -> Result<(), BoxError> {
        self.0.run(ctx, payload).await
    }

    async fn unload(&self) {
        self.0.unload().await
    }
}

/// How a [`Failing`] handler misbehaves.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Error,
    Panic,
}

/// A handler whose `run` always fails.
pub struct Failing {
    rule: String,
    class: EventClass,
    failure: Failure,
    journal: Journal,
}

impl Failing {
    pub fn new(rule: &str, class: EventClass, failure: Failure, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            rule: rule.to_string(),
            class,
            failure,
            journal: journal.clone(),
        })
    }
}

#[async_trait]
impl Handler for Failing {
    fn rule(&self) -> &str {
        &self.rule
    }

    fn handler_type(&self) -> EventClass {
        self.class
    }

    async fn run(&self, _ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
        self.journal.lock().push("failing".to_string());
        match self.failure {
            Failure::Error => Err("deliberate failure".into()),
            Failure::Panic => panic!("deliberate panic"),
        }
    }
}
