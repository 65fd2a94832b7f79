//! Inert stand-ins for the host objects learner code expects to find.
//!
//! Every shim is a native function bound to a request-local [`ShimState`];
//! calling one appends to the audit trail instead of touching a real page,
//! network or timer. Nothing here is shared between executions.

use std::cell::RefCell;
use std::rc::Rc;

use boa_engine::object::builtins::JsArray;
use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{
    Context, JsArgs, JsObject, JsResult, JsString, JsValue, NativeFunction, js_string,
};
use boa_gc::{Finalize, Trace};

use super::marshal::{Marshaller, to_std_string};
use super::trace::{ConsoleLevel, ShimRecord, ShimState};
use crate::output::format::format_value;

/// Globals bound to `undefined` so timers, network access and string
/// compilation are unusable rather than merely inert.
pub const UNDEFINED_GLOBALS: &[&str] = &[
    "setTimeout",
    "setInterval",
    "setImmediate",
    "clearTimeout",
    "clearInterval",
    "queueMicrotask",
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "eval",
    "Function",
];

/// Value `prompt()` hands back.
pub const PROMPT_RESPONSE: &str = "user_input";

const WRITE_PREVIEW_CHARS: usize = 100;

/// Capability bundle installed into a fresh realm before untrusted code runs.
pub trait HostEnvironment {
    /// Bind the shim objects as globals of `context`.
    fn install(&self, context: &mut Context, marshaller: &Marshaller) -> JsResult<()>;

    /// Consume the environment and return what it recorded.
    fn finish(self) -> ShimRecord;
}

/// The console/document/window shim.
#[derive(Default)]
pub struct HostShim {
    state: Rc<RefCell<ShimState>>,
}

impl HostShim {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostEnvironment for HostShim {
    fn install(&self, context: &mut Context, marshaller: &Marshaller) -> JsResult<()> {
        let shim = ShimHandle {
            state: self.state.clone(),
            marshaller: marshaller.clone(),
        };

        let console = build_console(context, &shim);
        context.register_global_property(js_string!("console"), console, Attribute::all())?;

        let document = build_document(context, &shim);
        let alert = dialog(context, &shim, window_alert, js_string!("alert"));
        let confirm = dialog(context, &shim, window_confirm, js_string!("confirm"));
        let prompt = dialog(context, &shim, window_prompt, js_string!("prompt"));

        let location = ObjectInitializer::new(context)
            .property(
                js_string!("href"),
                js_string!("http://localhost/"),
                Attribute::all(),
            )
            .property(js_string!("pathname"), js_string!("/"), Attribute::all())
            .property(js_string!("host"), js_string!("localhost"), Attribute::all())
            .build();
        let window = ObjectInitializer::new(context)
            .property(js_string!("document"), document.clone(), Attribute::all())
            .property(js_string!("alert"), alert.clone(), Attribute::all())
            .property(js_string!("confirm"), confirm.clone(), Attribute::all())
            .property(js_string!("prompt"), prompt.clone(), Attribute::all())
            .property(js_string!("location"), location, Attribute::all())
            .property(js_string!("innerWidth"), 1920, Attribute::all())
            .property(js_string!("innerHeight"), 1080, Attribute::all())
            .build();

        context.register_global_property(js_string!("document"), document, Attribute::all())?;
        context.register_global_property(js_string!("window"), window, Attribute::all())?;
        context.register_global_property(js_string!("alert"), alert, Attribute::all())?;
        context.register_global_property(js_string!("confirm"), confirm, Attribute::all())?;
        context.register_global_property(js_string!("prompt"), prompt, Attribute::all())?;

        for name in UNDEFINED_GLOBALS {
            context.register_global_property(
                JsString::from(*name),
                JsValue::undefined(),
                Attribute::all(),
            )?;
        }

        Ok(())
    }

    fn finish(self) -> ShimRecord {
        std::mem::take(&mut *self.state.borrow_mut()).into_record()
    }
}

/// Captured by every native shim function.
#[derive(Clone, Trace, Finalize)]
struct ShimHandle {
    #[unsafe_ignore_trace]
    state: Rc<RefCell<ShimState>>,
    marshaller: Marshaller,
}

type ShimFn = fn(&JsValue, &[JsValue], &ShimHandle, &mut Context) -> JsResult<JsValue>;

impl ShimHandle {
    fn native(&self, f: ShimFn) -> NativeFunction {
        NativeFunction::from_copy_closure_with_captures(f, self.clone())
    }

    /// Format each argument and join with spaces, like console output.
    fn render(&self, args: &[JsValue], context: &mut Context) -> String {
        args.iter()
            .map(|arg| format_value(&self.marshaller.marshal(arg, context)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render_arg(&self, args: &[JsValue], index: usize, context: &mut Context) -> String {
        format_value(&self.marshaller.marshal(args.get_or_undefined(index), context))
    }

    // Rendering may run user getters that log, so it always finishes before
    // the state is borrowed.
    fn console(&self, level: ConsoleLevel, args: &[JsValue], context: &mut Context) {
        let message = self.render(args, context);
        self.state.borrow_mut().console(level, &message);
    }

    fn dom(&self, line: String) {
        self.state.borrow_mut().dom(line);
    }
}

fn build_console(context: &mut Context, shim: &ShimHandle) -> JsObject {
    ObjectInitializer::new(context)
        .function(shim.native(console_log), js_string!("log"), 0)
        .function(shim.native(console_debug), js_string!("debug"), 0)
        .function(shim.native(console_info), js_string!("info"), 0)
        .function(shim.native(console_warn), js_string!("warn"), 0)
        .function(shim.native(console_error), js_string!("error"), 0)
        .function(shim.native(console_table), js_string!("table"), 1)
        .function(shim.native(console_assert), js_string!("assert"), 0)
        .function(shim.native(console_time), js_string!("time"), 0)
        .function(shim.native(console_time_end), js_string!("timeEnd"), 0)
        .function(shim.native(console_clear), js_string!("clear"), 0)
        .build()
}

fn console_log(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    shim.console(ConsoleLevel::Log, args, ctx);
    Ok(JsValue::undefined())
}

fn console_debug(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    shim.console(ConsoleLevel::Debug, args, ctx);
    Ok(JsValue::undefined())
}

fn console_info(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    shim.console(ConsoleLevel::Info, args, ctx);
    Ok(JsValue::undefined())
}

fn console_warn(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    shim.console(ConsoleLevel::Warn, args, ctx);
    Ok(JsValue::undefined())
}

fn console_error(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    shim.console(ConsoleLevel::Error, args, ctx);
    Ok(JsValue::undefined())
}

fn console_table(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let rendered = shim.render_arg(args, 0, ctx);
    shim.state.borrow_mut().push(rendered);
    Ok(JsValue::undefined())
}

fn console_assert(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    if args.get_or_undefined(0).to_boolean() {
        return Ok(JsValue::undefined());
    }
    let message = shim.render(args.get(1..).unwrap_or_default(), ctx);
    let line = format!("[ASSERT FAILED] {}", message);
    shim.state.borrow_mut().push(line.trim_end());
    Ok(JsValue::undefined())
}

fn timer_label(args: &[JsValue], ctx: &mut Context) -> String {
    let label = args.get_or_undefined(0);
    if label.is_undefined() {
        "default".to_string()
    } else {
        to_std_string(label, ctx)
    }
}

fn console_time(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let label = timer_label(args, ctx);
    shim.state.borrow_mut().start_timer(&label);
    Ok(JsValue::undefined())
}

fn console_time_end(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let label = timer_label(args, ctx);
    let mut state = shim.state.borrow_mut();
    match state.end_timer(&label) {
        Some(elapsed) => {
            let line = format!("{}: {:.3}ms", label, elapsed.as_secs_f64() * 1000.0);
            state.push(line);
        }
        None => state.console(
            ConsoleLevel::Warn,
            &format!("Timer '{}' does not exist", label),
        ),
    }
    Ok(JsValue::undefined())
}

/// Accepted for compatibility; the log is append-only so nothing is removed.
fn console_clear(_: &JsValue, _: &[JsValue], _: &ShimHandle, _: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::undefined())
}

fn build_document(context: &mut Context, shim: &ShimHandle) -> JsObject {
    let body = build_element(context, shim, "body");
    let head = build_element(context, shim, "head");
    let html = build_element(context, shim, "html");

    ObjectInitializer::new(context)
        .property(js_string!("body"), body, Attribute::all())
        .property(js_string!("head"), head, Attribute::all())
        .property(js_string!("documentElement"), html, Attribute::all())
        .function(
            shim.native(document_get_element_by_id),
            js_string!("getElementById"),
            1,
        )
        .function(shim.native(document_query_selector), js_string!("querySelector"), 1)
        .function(
            shim.native(document_query_selector_all),
            js_string!("querySelectorAll"),
            1,
        )
        .function(shim.native(document_create_element), js_string!("createElement"), 1)
        .function(
            shim.native(document_create_text_node),
            js_string!("createTextNode"),
            1,
        )
        .function(shim.native(document_write), js_string!("write"), 1)
        .build()
}

/// A detached mock element; mutations stay on the object and are logged.
fn build_element(context: &mut Context, shim: &ShimHandle, tag: &str) -> JsObject {
    let children = JsArray::new(context);
    let style = ObjectInitializer::new(context).build();

    ObjectInitializer::new(context)
        .property(
            js_string!("tagName"),
            JsString::from(tag.to_uppercase().as_str()),
            Attribute::all(),
        )
        .property(js_string!("id"), JsString::default(), Attribute::all())
        .property(js_string!("className"), JsString::default(), Attribute::all())
        .property(js_string!("innerText"), JsString::default(), Attribute::all())
        .property(js_string!("innerHTML"), JsString::default(), Attribute::all())
        .property(js_string!("textContent"), JsString::default(), Attribute::all())
        .property(js_string!("style"), style, Attribute::all())
        .property(js_string!("children"), children, Attribute::all())
        .function(shim.native(element_append_child), js_string!("appendChild"), 1)
        .function(shim.native(element_set_attribute), js_string!("setAttribute"), 2)
        .function(shim.native(element_get_attribute), js_string!("getAttribute"), 1)
        .function(
            shim.native(element_add_event_listener),
            js_string!("addEventListener"),
            2,
        )
        .build()
}

fn document_get_element_by_id(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let id = shim.render_arg(args, 0, ctx);
    shim.dom(format!("[DOM] getElementById(\"{}\") called", id));
    let element = build_element(ctx, shim, "div");
    element.set(js_string!("id"), JsString::from(id.as_str()), false, ctx)?;
    Ok(element.into())
}

fn document_query_selector(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let selector = shim.render_arg(args, 0, ctx);
    shim.dom(format!("[DOM] querySelector(\"{}\") called", selector));
    Ok(build_element(ctx, shim, "div").into())
}

fn document_query_selector_all(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let selector = shim.render_arg(args, 0, ctx);
    shim.dom(format!("[DOM] querySelectorAll(\"{}\") called", selector));
    let element: JsValue = build_element(ctx, shim, "div").into();
    Ok(JsArray::from_iter([element], ctx).into())
}

fn document_create_element(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let tag = shim.render_arg(args, 0, ctx);
    shim.dom(format!("[DOM] createElement(\"{}\")", tag));
    Ok(build_element(ctx, shim, &tag).into())
}

fn document_create_text_node(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let text = shim.render_arg(args, 0, ctx);
    shim.dom(format!("[DOM] createTextNode(\"{}\")", text));
    let node = ObjectInitializer::new(ctx)
        .property(
            js_string!("textContent"),
            JsString::from(text.as_str()),
            Attribute::all(),
        )
        .property(js_string!("nodeType"), 3, Attribute::all())
        .build();
    Ok(node.into())
}

fn document_write(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let html = shim.render_arg(args, 0, ctx);
    let preview: String = html.chars().take(WRITE_PREVIEW_CHARS).collect();
    let ellipsis = if html.chars().count() > WRITE_PREVIEW_CHARS { "..." } else { "" };
    shim.dom(format!("[DOM] document.write: {}{}", preview, ellipsis));
    Ok(JsValue::undefined())
}

/// `tagName` of a mock element, or `element` for anything else.
fn tag_name(value: &JsValue, ctx: &mut Context) -> String {
    let tag = match value.as_object() {
        Some(object) => object.get(js_string!("tagName"), ctx).unwrap_or_default(),
        None => JsValue::undefined(),
    };
    if tag.is_string() {
        let tag = to_std_string(&tag, ctx);
        if !tag.is_empty() {
            return tag;
        }
    }
    "element".to_string()
}

fn element_append_child(
    this: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let child = args.get_or_undefined(0).clone();
    let parent_tag = tag_name(this, ctx);
    let child_tag = tag_name(&child, ctx);

    if let Some(parent) = this.as_object() {
        let children = parent.get(js_string!("children"), ctx)?;
        if let Some(children) = children.as_object() {
            JsArray::from_object(children.clone())?.push(child.clone(), ctx)?;
        }
    }

    shim.dom(format!("[DOM] Appended {} to {}", child_tag, parent_tag));
    Ok(child)
}

fn element_set_attribute(
    this: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let name = to_std_string(args.get_or_undefined(0), ctx);
    let value = args.get_or_undefined(1).clone();
    let shown = shim.render_arg(args, 1, ctx);

    if let Some(element) = this.as_object() {
        element.set(JsString::from(name.as_str()), value, false, ctx)?;
    }
    shim.dom(format!("[DOM] setAttribute(\"{}\", \"{}\")", name, shown));
    Ok(JsValue::undefined())
}

fn element_get_attribute(
    this: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let name = to_std_string(args.get_or_undefined(0), ctx);
    shim.dom(format!("[DOM] getAttribute(\"{}\")", name));

    match this.as_object() {
        Some(element) => element.get(JsString::from(name.as_str()), ctx),
        None => Ok(JsValue::undefined()),
    }
}

fn element_add_event_listener(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let event = to_std_string(args.get_or_undefined(0), ctx);
    shim.dom(format!("[DOM] Added \"{}\" event listener", event));
    Ok(JsValue::undefined())
}

/// Build a dialog function once so `window.alert === alert`.
fn dialog(context: &mut Context, shim: &ShimHandle, f: ShimFn, name: JsString) -> JsValue {
    FunctionObjectBuilder::new(context.realm(), shim.native(f))
        .name(name)
        .length(1)
        .constructor(false)
        .build()
        .into()
}

fn window_alert(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let message = shim.render_arg(args, 0, ctx);
    shim.dom(format!("[ALERT] {}", message));
    Ok(JsValue::undefined())
}

fn window_confirm(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let message = shim.render_arg(args, 0, ctx);
    shim.dom(format!("[CONFIRM] {}", message));
    Ok(JsValue::from(true))
}

fn window_prompt(
    _: &JsValue,
    args: &[JsValue],
    shim: &ShimHandle,
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let message = shim.render_arg(args, 0, ctx);
    shim.dom(format!("[PROMPT] {}", message));
    Ok(JsValue::from(JsString::from(PROMPT_RESPONSE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;

    fn run(source: &str) -> (JsResult<JsValue>, ShimRecord) {
        let mut context = Context::default();
        let marshaller = Marshaller::capture(&mut context).unwrap();
        let shim = HostShim::new();
        shim.install(&mut context, &marshaller).unwrap();
        let result = context.eval(Source::from_bytes(source));
        drop(context);
        (result, shim.finish())
    }

    #[test]
    fn test_console_levels_are_prefixed() {
        let (result, record) =
            run("console.log('a', 1); console.info('b'); console.warn('c'); console.error('d');");
        assert!(result.is_ok());
        assert_eq!(record.logs, vec!["a 1", "[INFO] b", "[WARN] c", "[ERROR] d"]);
        assert!(!record.dom_touched);
    }

    #[test]
    fn test_dialogs_resolve_synchronously() {
        let (result, record) = run(
            "var ok = confirm('sure?'); var name = prompt('name?'); \
             alert(ok + ':' + name); window.alert === alert",
        );
        assert!(result.unwrap().to_boolean());
        assert_eq!(
            record.logs,
            vec!["[CONFIRM] sure?", "[PROMPT] name?", "[ALERT] true:user_input"]
        );
        assert!(record.dom_touched);
    }

    #[test]
    fn test_undefined_globals() {
        let (result, _) = run("typeof setTimeout + typeof fetch + typeof eval + typeof Function");
        let value = result.unwrap();
        let text = value.as_string().unwrap().to_std_string_escaped();
        assert_eq!(text, "undefinedundefinedundefinedundefined");
    }

    #[test]
    fn test_assert_only_logs_failures() {
        let (_, record) =
            run("console.assert(true, 'fine'); console.assert(1 > 2, 'math', 'broke');");
        assert_eq!(record.logs, vec!["[ASSERT FAILED] math broke"]);
    }

    #[test]
    fn test_clear_keeps_history() {
        let (_, record) = run("console.log('kept'); console.clear();");
        assert_eq!(record.logs, vec!["kept"]);
    }
}
