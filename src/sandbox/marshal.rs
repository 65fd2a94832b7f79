use boa_engine::{Context, JsNativeError, JsObject, JsResult, JsString, JsValue, js_string};
use boa_gc::{Finalize, Trace};

use crate::output::format::{OpaqueKind, ScriptValue};

const MAX_DEPTH: usize = 32;
const MAX_ENTRIES: usize = 10_000;

/// Copies engine values into host-side [`ScriptValue`] trees.
///
/// Holds the realm's own `Object.keys` and `Array.isArray`, captured before
/// any untrusted code runs, so later reassignment of those globals does not
/// change how values are read back.
#[derive(Clone, Trace, Finalize)]
pub struct Marshaller {
    object_keys: JsObject,
    is_array: JsObject,
}

impl Marshaller {
    pub fn capture(context: &mut Context) -> JsResult<Self> {
        Ok(Self {
            object_keys: global_method(context, "Object", "keys")?,
            is_array: global_method(context, "Array", "isArray")?,
        })
    }

    pub fn marshal(&self, value: &JsValue, context: &mut Context) -> ScriptValue {
        let mut ancestors = Vec::new();
        self.marshal_inner(value, &mut ancestors, true, context)
    }

    /// `toJSON` is applied once per value, never to its own result.
    fn marshal_inner(
        &self,
        value: &JsValue,
        ancestors: &mut Vec<JsObject>,
        apply_to_json: bool,
        context: &mut Context,
    ) -> ScriptValue {
        if value.is_undefined() {
            return ScriptValue::Undefined;
        }
        if value.is_null() {
            return ScriptValue::Null;
        }
        if value.is_boolean() {
            return ScriptValue::Bool(value.to_boolean());
        }
        if value.is_number() {
            return ScriptValue::Number(value.to_number(context).unwrap_or(f64::NAN));
        }
        if value.is_string() {
            return ScriptValue::String(to_std_string(value, context));
        }
        if value.is_symbol() {
            return ScriptValue::Opaque {
                kind: OpaqueKind::Symbol,
                text: value.display().to_string(),
            };
        }
        if value.is_bigint() {
            return ScriptValue::Opaque {
                kind: OpaqueKind::BigInt,
                text: value.display().to_string(),
            };
        }

        let Some(object) = value.as_object().cloned() else {
            return ScriptValue::Truncated { array: false };
        };

        if object.is_callable() {
            return ScriptValue::Function {
                name: function_name(&object, context),
            };
        }
        if ancestors.iter().any(|seen| JsObject::equals(seen, &object)) {
            return ScriptValue::Circular;
        }
        if apply_to_json
            && let Some(replacement) = self.to_json_replacement(&object, value, context)
        {
            return match replacement {
                Ok(replacement) => ScriptValue::Replaced(Box::new(self.marshal_inner(
                    &replacement,
                    ancestors,
                    false,
                    context,
                ))),
                Err(_) => ScriptValue::Truncated { array: false },
            };
        }

        let array = self.is_array(value, context);
        if ancestors.len() >= MAX_DEPTH {
            return ScriptValue::Truncated { array };
        }

        ancestors.push(object.clone());
        let marshalled = if array {
            self.marshal_array(&object, ancestors, context)
        } else {
            self.marshal_object(&object, value, ancestors, context)
        };
        ancestors.pop();
        marshalled
    }

    /// Result of a callable `toJSON`, if the object has one
    fn to_json_replacement(
        &self,
        object: &JsObject,
        value: &JsValue,
        context: &mut Context,
    ) -> Option<JsResult<JsValue>> {
        let to_json = object.get(js_string!("toJSON"), context).ok()?;
        let method = to_json.as_callable()?;
        Some(method.call(value, &[], context))
    }

    fn is_array(&self, value: &JsValue, context: &mut Context) -> bool {
        self.is_array
            .call(&JsValue::undefined(), std::slice::from_ref(value), context)
            .map(|result| result.to_boolean())
            .unwrap_or(false)
    }

    fn marshal_array(
        &self,
        object: &JsObject,
        ancestors: &mut Vec<JsObject>,
        context: &mut Context,
    ) -> ScriptValue {
        let Some(length) = read_length(object, context) else {
            return ScriptValue::Truncated { array: true };
        };
        if length > MAX_ENTRIES {
            return ScriptValue::Truncated { array: true };
        }

        let mut items = Vec::with_capacity(length);
        for index in 0..length as u32 {
            let item = match object.get(index, context) {
                Ok(item) => self.marshal_inner(&item, ancestors, true, context),
                Err(_) => ScriptValue::Truncated { array: false },
            };
            items.push(item);
        }
        ScriptValue::Array(items)
    }

    fn marshal_object(
        &self,
        object: &JsObject,
        value: &JsValue,
        ancestors: &mut Vec<JsObject>,
        context: &mut Context,
    ) -> ScriptValue {
        let keys = match self.object_keys.call(
            &JsValue::undefined(),
            std::slice::from_ref(value),
            context,
        ) {
            Ok(keys) => keys,
            Err(_) => return ScriptValue::Truncated { array: false },
        };
        let Some(keys) = keys.as_object().cloned() else {
            return ScriptValue::Truncated { array: false };
        };
        let Some(length) = read_length(&keys, context) else {
            return ScriptValue::Truncated { array: false };
        };
        if length > MAX_ENTRIES {
            return ScriptValue::Truncated { array: false };
        }

        let mut entries = Vec::with_capacity(length);
        for index in 0..length as u32 {
            let Ok(key) = keys.get(index, context) else {
                return ScriptValue::Truncated { array: false };
            };
            let key = to_std_string(&key, context);
            let member = match object.get(JsString::from(key.as_str()), context) {
                Ok(member) => self.marshal_inner(&member, ancestors, true, context),
                Err(_) => ScriptValue::Truncated { array: false },
            };
            entries.push((key, member));
        }
        ScriptValue::Object(entries)
    }
}

/// Look up `owner.name` on the global object and require it to be callable.
pub fn global_method(context: &mut Context, owner: &str, name: &str) -> JsResult<JsObject> {
    let global = context.global_object();
    let owner = global.get(JsString::from(owner), context)?;
    let owner = owner
        .as_object()
        .ok_or_else(|| JsNativeError::typ().with_message("intrinsic owner is not an object"))?;
    let method = owner.get(JsString::from(name), context)?;
    method
        .as_callable()
        .cloned()
        .ok_or_else(|| JsNativeError::typ().with_message("intrinsic is not callable").into())
}

/// Convert a JS value to a Rust string the way `String(value)` would, without throwing.
pub fn to_std_string(value: &JsValue, context: &mut Context) -> String {
    match value.to_string(context) {
        Ok(s) => s.to_std_string_escaped(),
        Err(_) => value.display().to_string(),
    }
}

fn read_length(object: &JsObject, context: &mut Context) -> Option<usize> {
    let length = object.get(js_string!("length"), context).ok()?;
    let length = length.to_number(context).ok()?;
    if length.is_finite() && length >= 0.0 {
        Some(length as usize)
    } else {
        None
    }
}

fn function_name(object: &JsObject, context: &mut Context) -> Option<String> {
    let name = object.get(js_string!("name"), context).ok()?;
    if !name.is_string() {
        return None;
    }
    let name = to_std_string(&name, context);
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;

    fn marshal_source(source: &str) -> ScriptValue {
        let mut context = Context::default();
        let marshaller = Marshaller::capture(&mut context).unwrap();
        let value = context.eval(Source::from_bytes(source)).unwrap();
        marshaller.marshal(&value, &mut context)
    }

    #[test]
    fn test_primitives() {
        assert_eq!(marshal_source("undefined"), ScriptValue::Undefined);
        assert_eq!(marshal_source("null"), ScriptValue::Null);
        assert_eq!(marshal_source("1 + 1"), ScriptValue::Number(2.0));
        assert_eq!(marshal_source("'a' + 'b'"), ScriptValue::String("ab".to_string()));
        assert_eq!(marshal_source("!0"), ScriptValue::Bool(true));
    }

    #[test]
    fn test_named_function() {
        assert_eq!(
            marshal_source("(function greet() {})"),
            ScriptValue::Function {
                name: Some("greet".to_string())
            }
        );
    }

    #[test]
    fn test_nested_structure_keeps_key_order() {
        assert_eq!(
            marshal_source("({ b: [1, 'x'], a: null })"),
            ScriptValue::Object(vec![
                (
                    "b".to_string(),
                    ScriptValue::Array(vec![
                        ScriptValue::Number(1.0),
                        ScriptValue::String("x".to_string()),
                    ])
                ),
                ("a".to_string(), ScriptValue::Null),
            ])
        );
    }

    #[test]
    fn test_self_reference_is_marked_circular() {
        assert_eq!(
            marshal_source("var o = {}; o.self = o; o"),
            ScriptValue::Object(vec![("self".to_string(), ScriptValue::Circular)])
        );
    }

    #[test]
    fn test_to_json_is_honoured() {
        assert_eq!(
            marshal_source("({ toJSON: function() { return 'custom'; } })"),
            ScriptValue::Replaced(Box::new(ScriptValue::String("custom".to_string())))
        );
    }

    #[test]
    fn test_to_json_returning_itself_is_not_circular() {
        assert_eq!(
            marshal_source("({ a: 1, toJSON() { return this; } })"),
            ScriptValue::Replaced(Box::new(ScriptValue::Object(vec![
                ("a".to_string(), ScriptValue::Number(1.0)),
                (
                    "toJSON".to_string(),
                    ScriptValue::Function {
                        name: Some("toJSON".to_string())
                    }
                ),
            ])))
        );
    }

    #[test]
    fn test_oversized_array_is_truncated() {
        assert_eq!(
            marshal_source("new Array(20000)"),
            ScriptValue::Truncated { array: true }
        );
        assert!(matches!(
            marshal_source("Array.from({ length: 1500 }, (_, i) => i)"),
            ScriptValue::Array(items) if items.len() == 1500
        ));
    }
}
