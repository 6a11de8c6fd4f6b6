//! Renders a parsed template against a property bag.

use super::parser::{Hint, TemplateToken};
use crate::capture::CapturedValue;
use crate::event::PropertyBag;

pub fn render(tokens: &[TemplateToken], properties: &PropertyBag) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            TemplateToken::Literal(text) => out.push_str(text),
            TemplateToken::Property {
                name,
                hint,
                alignment,
                format,
            } => {
                let rendered = match properties.get(name) {
                    Some(value) => render_value(value, *hint, format.as_deref()),
                    None => format!("{{{}}}", name), // unbound: render the hole verbatim
                };
                out.push_str(&apply_alignment(&rendered, *alignment));
            }
        }
    }
    out
}

fn render_value(value: &CapturedValue, hint: Hint, format: Option<&str>) -> String {
    match hint {
        // Force the scalar/native default string form even for a complex value, with
        // no quoting — the format specifier doesn't apply here, same as the original
        // renders `$Value` as a bare string.
        Hint::Stringify => value.render_scalar(),
        Hint::Destructure | Hint::Plain => apply_format(value, format),
    }
}

fn apply_format(value: &CapturedValue, format: Option<&str>) -> String {
    match (value, format) {
        (CapturedValue::Float(f), Some(fmt)) if fmt.starts_with('F') || fmt.starts_with('f') => {
            let precision: usize = fmt[1..].parse().unwrap_or(2);
            format!("{:.*}", precision, f)
        }
        (CapturedValue::Int(i), Some(fmt)) if fmt.starts_with('X') => format!("{:X}", i),
        (CapturedValue::Int(i), Some(fmt)) if fmt.starts_with('x') => format!("{:x}", i),
        _ => value.render_scalar(),
    }
}

fn apply_alignment(text: &str, alignment: Option<i32>) -> String {
    match alignment {
        None => text.to_string(),
        Some(width) if width >= 0 => format!("{:>width$}", text, width = width as usize),
        Some(width) => format!("{:<width$}", text, width = (-width) as usize),
    }
}
