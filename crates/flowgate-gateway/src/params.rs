//! `$(path)` parameter substitution for policy properties.
//!
//! Before each policy invocation its configuration properties pass through
//! [`resolve`]: any string value containing `$(path)` references is
//! rewritten against the request context.
//!
//! Two cases matter:
//! - A string that is *entirely* one reference (`"$(request.path)"`) yields
//!   the **typed** context value — arrays and objects pass through intact.
//! - References embedded in a larger string are stringified in place;
//!   unresolved embedded references become the empty string, and an
//!   unresolved exact-match reference yields `null`.  Substitution never
//!   fails.
//!
//! Resolution recurses through object and array property values.

use flowgate_kernel::Context;
use serde_json::Value;

/// Substitute `$(path)` references in `props` against `ctx`.
pub fn resolve(props: &Value, ctx: &Context) -> Value {
    match props {
        Value::String(s) => resolve_string(s, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_string(s: &str, ctx: &Context) -> Value {
    // Exact-match special case: the whole string is one reference.
    if let Some(path) = exact_reference(s) {
        return ctx.get(path).cloned().unwrap_or(Value::Null);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find(')') {
            Some(end) => {
                let path = &after[..end];
                if let Some(value) = ctx.get(path) {
                    out.push_str(&stringify(value));
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated reference: keep the literal remainder.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Value::String(out)
}

/// `Some(path)` when `s` is exactly one `$(path)` reference.
fn exact_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("$(")?.strip_suffix(')')?;
    if inner.contains(')') { None } else { Some(inner) }
}

/// Render a context value for embedding inside a larger string.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        let mut c = Context::new();
        c.set("target-host", json!("somehost"));
        c.set("request.path", json!("apim/stockQuote"));
        c
    }

    #[test]
    fn embedded_references_are_stringified_in_place() {
        let out = resolve(
            &json!("https://$(target-host)/services/climbing/$(request.path)"),
            &ctx(),
        );
        assert_eq!(
            out,
            json!("https://somehost/services/climbing/apim/stockQuote")
        );
    }

    #[test]
    fn exact_reference_yields_the_typed_value() {
        let mut c = Context::new();
        c.set("request.path", json!(["a", "b"]));
        let out = resolve(&json!("$(request.path)"), &c);
        assert_eq!(out, json!(["a", "b"]));
    }

    #[test]
    fn exact_reference_to_an_object_passes_through() {
        let mut c = Context::new();
        c.set("message.headers", json!({ "content-type": "application/json" }));
        let out = resolve(&json!("$(message.headers)"), &c);
        assert_eq!(out, json!({ "content-type": "application/json" }));
    }

    #[test]
    fn unresolved_exact_reference_is_null() {
        let out = resolve(&json!("$(no.such.path)"), &Context::new());
        assert_eq!(out, Value::Null);
    }

    #[test]
    fn unresolved_embedded_reference_is_empty_not_an_error() {
        let out = resolve(&json!("x-$(missing)-y"), &Context::new());
        assert_eq!(out, json!("x--y"));
    }

    #[test]
    fn numbers_embed_without_quotes() {
        let mut c = Context::new();
        c.set("n", json!(7));
        assert_eq!(resolve(&json!("v=$(n)"), &c), json!("v=7"));
    }

    #[test]
    fn substitution_recurses_through_objects_and_arrays() {
        let out = resolve(
            &json!({
                "url": "https://$(target-host)/q",
                "list": ["$(request.path)", "literal"],
                "n": 3
            }),
            &ctx(),
        );
        assert_eq!(
            out,
            json!({
                "url": "https://somehost/q",
                "list": ["apim/stockQuote", "literal"],
                "n": 3
            })
        );
    }

    #[test]
    fn strings_without_references_pass_through() {
        assert_eq!(resolve(&json!("plain"), &ctx()), json!("plain"));
    }

    #[test]
    fn unterminated_reference_stays_literal() {
        assert_eq!(resolve(&json!("a$(oops"), &ctx()), json!("a$(oops"));
    }
}
