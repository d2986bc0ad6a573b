//! Code evaluation sink.
//!
//! Rust has no `eval`, so untrusted text is handed to an interpreter
//! process instead. The text reaches the interpreter untouched.

use std::collections::BTreeMap;
use std::process::Command;

use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    #[error("failed to start interpreter `{program}`: {source}")]
    Spawn { program: String, source: std::io::Error },
    #[error("interpreter exited with {status}:\n{stderr}")]
    Failed { status: std::process::ExitStatus, stderr: String },
}

/// Names visible to an evaluated expression.
pub type Scope = Map<String, Value>;

pub trait ScriptEngine: Send + Sync {
    /// Evaluate an expression and return the printed result.
    fn eval(&self, expr: &str, scope: &Scope) -> Result<String, ScriptError>;
    /// Execute a block of statements for their side effects.
    fn exec(&self, code: &str) -> Result<(), ScriptError>;
}

const EVAL_PRELUDE: &str = "import sys, json\nprint(eval(sys.argv[1], {}, json.loads(sys.argv[2])))";
const EXEC_PRELUDE: &str = "import sys\nexec(sys.argv[1])";

/// Engine backed by a Python interpreter (`python3 -c`).
#[derive(Debug, Clone)]
pub struct PythonEngine {
    program: String,
}

impl PythonEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    fn run(&self, cmd: &mut Command) -> Result<String, ScriptError> {
        let out = cmd.output().map_err(|source| ScriptError::Spawn { program: self.program.clone(), source })?;
        if !out.status.success() {
            return Err(ScriptError::Failed {
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim_end().to_string())
    }
}

impl Default for PythonEngine {
    fn default() -> Self { Self::new("python3") }
}

impl ScriptEngine for PythonEngine {
    fn eval(&self, expr: &str, scope: &Scope) -> Result<String, ScriptError> {
        let locals = Value::Object(scope.clone()).to_string();
        self.run(Command::new(&self.program).arg("-c").arg(EVAL_PRELUDE).arg(expr).arg(locals))
    }

    fn exec(&self, code: &str) -> Result<(), ScriptError> {
        self.run(Command::new(&self.program).arg("-c").arg(EXEC_PRELUDE).arg(code)).map(|_| ())
    }
}

/// Python truthiness of a printed value.
pub fn is_truthy(printed: &str) -> bool {
    !matches!(printed.trim(), "" | "False" | "None" | "0" | "0.0" | "[]" | "{}" | "()" | "set()")
}

/// Substitute `{{ key }}` placeholders with the *evaluated* context value.
pub fn process_template(
    template: &str,
    context: &BTreeMap<String, String>,
    engine: &dyn ScriptEngine,
) -> Result<String, ScriptError> {
    let mut rendered = template.to_string();
    for (key, value) in context {
        let evaluated = engine.eval(value, &Scope::new())?;
        rendered = rendered.replace(&format!("{{{{ {key} }}}}"), &evaluated);
    }
    Ok(rendered)
}

/// Render template *source*: every `{{ expr }}` is evaluated and spliced in.
pub fn render_template_string(source: &str, engine: &dyn ScriptEngine) -> Result<String, ScriptError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else { break };
        out.push_str(&rest[..open]);
        let expr = rest[open + 2..open + 2 + close].trim();
        out.push_str(&engine.eval(expr, &Scope::new())?);
        rest = &rest[open + 2 + close + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
