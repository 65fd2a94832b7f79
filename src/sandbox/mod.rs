//! Execution bounding for untrusted script text.
//!
//! Every run gets a brand-new engine context and a caller-supplied
//! [`HostEnvironment`]. The wall-clock budget is checked **after** the
//! engine returns: the interpreter has no preemption point inside untrusted
//! code, so a genuine infinite loop is not interrupted and blocks the calling
//! thread for as long as it runs. A timeout verdict therefore does not mean
//! the work was cancelled. Forceful termination needs a killable boundary
//! such as a separate process (see [`crate::external::CommandInterpreter`]).
//!
//! Code always runs in strict mode, so assigning to an undeclared name throws
//! instead of creating a global.

pub mod marshal;
pub mod mocks;
pub mod trace;

use std::io::Read;
use std::thread;
use std::time::{Duration, Instant};

use boa_engine::{
    Context, JsError, JsObject, JsResult, JsString, JsValue, Script, Source, js_string,
};

use crate::analyze::is_bare_expression;
use crate::error::ExecutionError;
use crate::output::format::ScriptValue;

pub use marshal::Marshaller;
pub use mocks::{HostEnvironment, HostShim};
pub use trace::{ConsoleLevel, ShimRecord, ShimState};

/// What happened when the source was invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// The invocation returned, normally or by throwing
    pub completed: bool,
    /// Elapsed time exceeded the budget (checked after the fact)
    pub timed_out: bool,
    /// Completion value of a bare expression, or the explicit `return` value
    pub returned_value: Option<ScriptValue>,
    /// Message of an error raised by the source
    pub thrown: Option<String>,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Stack reserved for the engine thread. The parser and interpreter recurse
/// on nesting, and source depth is capped before it gets here.
const ENGINE_STACK_BYTES: usize = 64 * 1024 * 1024;

/// Directive placed on the first line of compiled statement bodies.
const STRICT_DIRECTIVE: &str = "'use strict'; ";

/// Outcome plus everything the host environment recorded during the run.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedRun {
    pub outcome: ExecutionOutcome,
    pub record: ShimRecord,
}

/// Run `source` against a fresh [`HostShim`] on a dedicated engine thread.
///
/// The calling thread blocks until the engine returns.
pub fn run_on_engine_thread(
    source: String,
    budget: Duration,
) -> Result<BoundedRun, ExecutionError> {
    let handle = thread::Builder::new()
        .name("sandpit-engine".to_string())
        .stack_size(ENGINE_STACK_BYTES)
        .spawn(move || run_bounded(&source, HostShim::new(), budget))
        .map_err(|err| {
            tracing::error!(error = %err, "failed to spawn engine thread");
            ExecutionError::EngineUnavailable(err.to_string())
        })?;

    handle.join().map_err(|_| {
        tracing::error!("engine thread panicked");
        ExecutionError::EngineUnavailable("engine thread panicked".to_string())
    })
}

/// Run `source` against `host` in a fresh realm and compare elapsed time to `budget`.
pub fn run_bounded<H: HostEnvironment>(source: &str, host: H, budget: Duration) -> BoundedRun {
    let bare = is_bare_expression(source);
    let mut context = Context::default();
    context.strict(true);

    let prepared = prepare(&mut context, &host);
    let started = Instant::now();
    let result = prepared.and_then(|(marshaller, compile)| {
        let value = invoke(source, bare, &compile, &mut context)?;
        Ok((marshaller, value))
    });
    // Promise reactions only reach shims, so draining them here is enough.
    let _ = context.run_jobs();
    let elapsed = started.elapsed();
    let timed_out = elapsed > budget;

    let (returned_value, thrown) = match result {
        Ok((marshaller, value)) => (returned(&marshaller, &value, &mut context), None),
        Err(err) => (None, Some(error_message(err, &mut context))),
    };

    if timed_out {
        tracing::warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64,
            "execution exceeded its budget"
        );
    } else {
        tracing::debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            bare,
            threw = thrown.is_some(),
            "execution finished"
        );
    }

    drop(context);
    BoundedRun {
        outcome: ExecutionOutcome {
            completed: true,
            timed_out,
            returned_value,
            thrown,
            elapsed,
        },
        record: host.finish(),
    }
}

/// Capture intrinsics, then let the host environment replace globals.
fn prepare<H: HostEnvironment>(
    context: &mut Context,
    host: &H,
) -> JsResult<(Marshaller, JsObject)> {
    let marshaller = Marshaller::capture(context)?;
    let compile = function_constructor(context)?;
    host.install(context, &marshaller)?;
    Ok((marshaller, compile))
}

/// The realm's `Function` constructor, taken before the global binding is removed.
fn function_constructor(context: &mut Context) -> JsResult<JsObject> {
    let global = context.global_object();
    let ctor = global.get(js_string!("Function"), context)?;
    ctor.as_constructor().cloned().ok_or_else(|| {
        boa_engine::JsNativeError::typ()
            .with_message("Function constructor is unavailable")
            .into()
    })
}

fn invoke(
    source: &str,
    bare: bool,
    compile: &JsObject,
    context: &mut Context,
) -> JsResult<JsValue> {
    if bare {
        return parse_bare(source, context)?.evaluate(context);
    }

    let body = JsValue::from(JsString::from(format!("{STRICT_DIRECTIVE}{source}")));
    let function = compile.construct(&[body], None, context)?;
    function.call(&JsValue::undefined(), &[], context)
}

/// A bare source starting with `{` is an object literal when it parses as one.
fn parse_bare(source: &str, context: &mut Context) -> JsResult<Script> {
    if source.trim_start().starts_with('{') {
        let wrapped = (&b"("[..]).chain(source.as_bytes()).chain(&b"\n)"[..]);
        if let Ok(script) = Script::parse(Source::from_reader(wrapped, None), None, context) {
            return Ok(script);
        }
    }
    Script::parse(Source::from_bytes(source), None, context)
}

/// `undefined` means there is nothing to show, for expressions and statements alike.
fn returned(
    marshaller: &Marshaller,
    value: &JsValue,
    context: &mut Context,
) -> Option<ScriptValue> {
    if value.is_undefined() {
        return None;
    }
    Some(marshaller.marshal(value, context))
}

/// The `message` of a thrown error object, or `String(value)` for anything else.
fn error_message(err: JsError, context: &mut Context) -> String {
    let thrown = err.to_opaque(context);

    if let Some(object) = thrown.as_object() {
        let message = object.get(js_string!("message"), context).unwrap_or_default();
        if message.is_string() {
            return marshal::to_std_string(&message, context);
        }
    }
    marshal::to_std_string(&thrown, context)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: Duration = Duration::from_secs(5);

    fn run(source: &str) -> BoundedRun {
        run_bounded(source, HostShim::new(), BUDGET)
    }

    #[test]
    fn test_bare_expression_value_is_captured() {
        let run = run("2 + 2");
        assert_eq!(run.outcome.returned_value, Some(ScriptValue::Number(4.0)));
        assert!(run.outcome.thrown.is_none());
        assert!(!run.outcome.timed_out);
    }

    #[test]
    fn test_statement_sequence_uses_explicit_return() {
        let run = run("const x = 20;\nreturn x + 1;");
        assert_eq!(run.outcome.returned_value, Some(ScriptValue::Number(21.0)));
    }

    #[test]
    fn test_statement_sequence_without_return_has_no_value() {
        let run = run("let x = 1; x++;");
        assert_eq!(run.outcome.returned_value, None);
    }

    #[test]
    fn test_thrown_error_message() {
        let run = run("throw new TypeError('nope');");
        assert_eq!(run.outcome.thrown.as_deref(), Some("nope"));
        assert!(run.outcome.completed);
    }

    #[test]
    fn test_bare_undefined_has_no_value() {
        assert_eq!(run("undefined").outcome.returned_value, None);
    }

    #[test]
    fn test_thrown_primitive() {
        let run = run("throw 'plain';");
        assert_eq!(run.outcome.thrown.as_deref(), Some("plain"));
    }

    #[test]
    fn test_logs_survive_a_throw() {
        let run = run("console.log('before'); missing();");
        assert_eq!(run.record.logs, vec!["before"]);
        assert!(run.outcome.thrown.unwrap().contains("missing"));
    }

    #[test]
    fn test_promise_callbacks_are_drained() {
        let run = run("Promise.resolve(7).then(function (v) { console.log('got', v); });");
        assert_eq!(run.record.logs, vec!["got 7"]);
    }

    #[test]
    fn test_undeclared_assignment_throws() {
        let assigned = run("total = 5;\nconsole.log(total);");
        assert!(assigned.record.logs.is_empty());
        assert!(assigned.outcome.thrown.unwrap().contains("total"));

        assert!(run("leaked = 1").outcome.thrown.is_some());
    }

    #[test]
    fn test_bare_braces_are_an_object_literal() {
        assert_eq!(
            run("{a: 1}").outcome.returned_value,
            Some(ScriptValue::Object(vec![("a".to_string(), ScriptValue::Number(1.0))]))
        );
        // a block that is not a valid literal still runs as a block
        assert_eq!(run("{ let y = 2 }").outcome.thrown, None);
    }

    #[test]
    fn test_engine_thread_runs_deep_recursion() {
        let run = run_on_engine_thread(
            "function depth(n) { return n === 0 ? 0 : 1 + depth(n - 1); }\nreturn depth(400);"
                .to_string(),
            BUDGET,
        )
        .unwrap();
        assert_eq!(run.outcome.returned_value, Some(ScriptValue::Number(400.0)));
    }

    #[test]
    fn test_zero_budget_reports_timeout_after_completion() {
        let run = run_bounded(
            "let n = 0; for (let i = 0; i < 20000; i++) { n += i; } console.log(n);",
            HostShim::new(),
            Duration::ZERO,
        );
        assert!(run.outcome.timed_out);
        assert!(run.outcome.completed);
        assert_eq!(run.record.logs, vec!["199990000"]);
    }
}
