//! Literal expression forms for the generated program. Only values that are
//! safe to inline end up here; references go through the registry/resolver.

use galgo_graph::Value;

pub fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `{:?}` keeps a decimal point on round floats (`1.0`, not `1`), which the
/// generated program relies on for type inference.
pub fn fmt_f32(v: f32) -> String {
    format!("{v:?}")
}

pub fn fmt_f64(v: f64) -> String {
    format!("{v:?}")
}

/// Render an inlineable value as a generated-code expression. Returns None
/// for reference-shaped values (nodes, components, assets, callables) and
/// for lists containing them.
pub fn literal_expr(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("nil()".to_string()),
        Value::Bool(v) => Some(format!("lit({v})")),
        Value::I32(v) => Some(format!("lit({v})")),
        Value::F32(v) => Some(format!("lit({})", fmt_f32(*v))),
        Value::F64(v) => Some(format!("lit({})", fmt_f64(*v))),
        Value::Str(v) => Some(format!("lit(\"{}\")", escape_str(v))),
        Value::Vec2 { x, y } => Some(format!("vec2({}, {})", fmt_f32(*x), fmt_f32(*y))),
        Value::Vec3 { x, y, z } => Some(format!(
            "vec3({}, {}, {})",
            fmt_f32(*x),
            fmt_f32(*y),
            fmt_f32(*z)
        )),
        Value::Quat { x, y, z, w } => Some(format!(
            "quat({}, {}, {}, {})",
            fmt_f32(*x),
            fmt_f32(*y),
            fmt_f32(*z),
            fmt_f32(*w)
        )),
        Value::Color { r, g, b, a } => Some(format!(
            "rgba({}, {}, {}, {})",
            fmt_f32(*r),
            fmt_f32(*g),
            fmt_f32(*b),
            fmt_f32(*a)
        )),
        Value::Enum { ty, variant } => Some(format!(
            "enum_value(\"{}\", \"{}\")",
            escape_str(ty),
            escape_str(variant)
        )),
        Value::List(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(literal_expr(item)?);
            }
            Some(format!("list([{}])", parts.join(", ")))
        }
        Value::Node(_) | Value::Component(_) | Value::Asset(_) | Value::Callable { .. } => None,
    }
}
