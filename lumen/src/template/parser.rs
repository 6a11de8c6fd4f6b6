//! Hand-written recursive-descent-free tokenizer for message templates.
//!
//! Templates are small enough (almost always under a few hundred bytes) that a single
//! linear scan with a small state machine is both simpler and faster than pulling in a
//! parser-combinator crate for this.

/// How a bound property should be captured/rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// `{Name}` — capture scalars directly, structural values via their `Display`.
    Plain,
    /// `{@Name}` — request destructured (structural) capture.
    Destructure,
    /// `{$Name}` — force a stringified scalar render.
    Stringify,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateToken {
    Literal(String),
    Property {
        name: String,
        hint: Hint,
        /// Positive pads right-aligned (left-pad), negative pads left-aligned.
        alignment: Option<i32>,
        format: Option<String>,
    },
}

pub fn parse(source: &str) -> Vec<TemplateToken> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '{' {
            // `{{` is an escaped literal brace.
            if chars.get(i + 1) == Some(&'{') {
                literal.push('{');
                i += 2;
                continue;
            }
            if let Some(end) = find_close(&chars, i) {
                if !literal.is_empty() {
                    tokens.push(TemplateToken::Literal(std::mem::take(&mut literal)));
                }
                let body: String = chars[i + 1..end].iter().collect();
                tokens.push(parse_property(&body));
                i = end + 1;
                continue;
            } else {
                // Unterminated `{`: treat literally rather than erroring — a
                // malformed template should still render something.
                literal.push(c);
                i += 1;
                continue;
            }
        } else if c == '}' && chars.get(i + 1) == Some(&'}') {
            literal.push('}');
            i += 2;
            continue;
        } else {
            literal.push(c);
            i += 1;
        }
    }
    if !literal.is_empty() {
        tokens.push(TemplateToken::Literal(literal));
    }
    tokens
}

fn find_close(chars: &[char], open_idx: usize) -> Option<usize> {
    chars[open_idx + 1..]
        .iter()
        .position(|&c| c == '}')
        .map(|p| open_idx + 1 + p)
}

fn parse_property(body: &str) -> TemplateToken {
    let mut rest = body;
    let hint = match rest.chars().next() {
        Some('@') => {
            rest = &rest[1..];
            Hint::Destructure
        }
        Some('$') => {
            rest = &rest[1..];
            Hint::Stringify
        }
        _ => Hint::Plain,
    };

    // Split off an optional `:Format` suffix first, then an optional `,Alignment`.
    let (name_and_align, format) = match rest.split_once(':') {
        Some((a, b)) => (a, Some(b.to_string())),
        None => (rest, None),
    };
    let (name, alignment) = match name_and_align.split_once(',') {
        Some((n, a)) => (n, a.trim().parse::<i32>().ok()),
        None => (name_and_align, None),
    };

    let name = name.trim().to_string();
    if !is_valid_property_name(&name) {
        // Invalid names are kept as a literal `{<content>}` token rather than failing
        // the whole parse.
        return TemplateToken::Literal(format!("{{{}}}", body));
    }

    TemplateToken::Property { name, hint, alignment, format }
}

/// First char letter or `_`, remainder letters/digits/`_`.
fn is_valid_property_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
