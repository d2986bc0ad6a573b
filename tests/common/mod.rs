#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::Value;
use vulnapp::db::{DbResult, QueryExecutor, Record};
use vulnapp::script::{Scope, ScriptEngine, ScriptError};
use vulnapp::{AppConfig, AppState};

// ---------------- Recording mocks (tests only) ----------------

/// Captures SQL text; answers with canned rows.
#[derive(Default)]
pub struct RecordingExecutor {
    pub queries: Mutex<Vec<String>>,
    pub rows: Vec<Record>,
}

impl RecordingExecutor {
    pub fn with_rows(rows: Vec<Record>) -> Self {
        Self { queries: Mutex::new(Vec::new()), rows }
    }
    pub fn last(&self) -> String {
        self.queries.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn fetch_one(&self, sql: &str) -> DbResult<Option<Record>> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.rows.first().cloned())
    }
    async fn fetch_all(&self, sql: &str) -> DbResult<Vec<Record>> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.rows.clone())
    }
    async fn execute(&self, sql: &str) -> DbResult<u64> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.rows.len() as u64)
    }
}

/// Captures every eval/exec call. `eval` answers through `reply`.
pub struct RecordingEngine {
    pub evals: Mutex<Vec<(String, Scope)>>,
    pub execs: Mutex<Vec<String>>,
    reply: Box<dyn Fn(&str, &Scope) -> String + Send + Sync>,
}

impl RecordingEngine {
    pub fn new(reply: impl Fn(&str, &Scope) -> String + Send + Sync + 'static) -> Self {
        Self { evals: Mutex::new(Vec::new()), execs: Mutex::new(Vec::new()), reply: Box::new(reply) }
    }
    pub fn constant(v: &str) -> Self {
        let v = v.to_string();
        Self::new(move |_, _| v.clone())
    }
}

impl ScriptEngine for RecordingEngine {
    fn eval(&self, expr: &str, scope: &Scope) -> Result<String, ScriptError> {
        self.evals.lock().unwrap().push((expr.to_string(), scope.clone()));
        Ok((self.reply)(expr, scope))
    }
    fn exec(&self, code: &str) -> Result<(), ScriptError> {
        self.execs.lock().unwrap().push(code.to_string());
        Ok(())
    }
}

pub fn state(db: Arc<dyn QueryExecutor>, engine: Arc<dyn ScriptEngine>, config: AppConfig) -> AppState {
    AppState { db, engine, config: Arc::new(config) }
}

pub fn default_state() -> AppState {
    state(
        Arc::new(RecordingExecutor::default()),
        Arc::new(RecordingEngine::constant("None")),
        AppConfig::default(),
    )
}

pub fn x_of(scope: &Scope) -> i64 {
    scope.get("x").and_then(Value::as_i64).unwrap_or_default()
}

// Helper to build a multipart body with provided bytes under field `name`
pub fn build_multipart(name: &str, bytes: &[u8], boundary: &str) -> (String, Vec<u8>) {
    let mut body: Vec<u8> = Vec::new();
    let disp = format!("--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"data.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n", boundary, name);
    body.extend_from_slice(disp.as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}
