//! Internal machinery for collecting debug logs.
#![doc(hidden)]

use std::cell::RefCell;
use std::time::SystemTime;

use chrono::prelude::*;
use serde::Serialize;
use strum::AsRefStr;

use crate::translate::ShapedQuery;
use crate::Query;

thread_local! {
    /// Debug info about the compilation running on this thread.
    /// Is reset by [log_start] and [log_finish].
    static CURRENT_LOG: RefCell<Option<DebugLog>> = const { RefCell::new(None) };
}

/// Starts capturing on the current thread. A log that was already started
/// is discarded.
pub fn log_start() {
    let started_at: DateTime<Utc> = SystemTime::now().into();
    let started_at = format!("{}", started_at.format("%+"));

    with_log(|log| {
        *log = Some(DebugLog {
            started_at,
            version: crate::compiler_version().to_string(),
            entries: Vec::new(),

            current_stage: Stage::Translate,
        });
    });
}

pub fn log_finish() -> Option<DebugLog> {
    with_log(Option::take).flatten()
}

pub fn log_is_enabled() -> bool {
    with_log(|log| log.is_some()).unwrap_or(false)
}

pub fn log_stage(stage: Stage) {
    with_log(|log| {
        if let Some(log) = log.as_mut() {
            log.current_stage = stage;
        }
    });
}

pub fn log_entry(entry: impl FnOnce() -> DebugEntryKind) {
    if !log_is_enabled() {
        return;
    }
    // built outside of the borrow, so it can log itself
    let kind = entry();

    with_log(|log| {
        if let Some(log) = log.as_mut() {
            log.entries.push(DebugEntry {
                stage: log.current_stage,
                kind,
            });
        }
    });
}

/// Runs `f` on the log of this thread, unless the log is already borrowed
/// further up the stack.
fn with_log<R>(f: impl FnOnce(&mut Option<DebugLog>) -> R) -> Option<R> {
    CURRENT_LOG.with(|cell| cell.try_borrow_mut().ok().map(|mut log| f(&mut log)))
}

#[derive(Debug, Serialize)]
pub struct DebugLog {
    pub started_at: String,
    pub version: String,
    pub entries: Vec<DebugEntry>,

    #[serde(skip)]
    current_stage: Stage,
}

impl DebugLog {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize)]
pub struct DebugEntry {
    pub stage: Stage,
    pub kind: DebugEntryKind,
}

#[derive(Debug, Serialize, AsRefStr)]
pub enum DebugEntryKind {
    ReprQuery(Query),
    ReprShaped(ShapedQuery),
    ReprSql(String),
    Message(Message),
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub level: String,
    pub module_path: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
pub enum Stage {
    Translate,
    Finalize,
    Generate,
}
