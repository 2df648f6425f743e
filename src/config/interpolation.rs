//! Variable expansion for command lines and process environments.
//!
//! # Syntax
//!
//! - `${name}` or `$name` - replaced with the variable's value
//! - `${name:default}` - replaced with `default` when `name` is unset
//! - `\$` - literal `$`
//!
//! Unknown variables expand to the empty string, never to an error.
//!
//! # Example
//!
//! ```
//! use invoker::config::expand_variables;
//! use std::collections::HashMap;
//!
//! let mut vars = HashMap::new();
//! vars.insert("file_name".to_string(), "main.rs".to_string());
//! assert_eq!(expand_variables("rustc ${file_name}", &vars), "rustc main.rs");
//! ```

use std::collections::HashMap;

/// A segment of an expandable string.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Variable reference with optional fallback
    Variable {
        name: String,
        default: Option<String>,
    },
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse a string containing `$name` / `${name}` references.
pub fn parse_interpolation(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current_literal = String::new();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'$') => {
                chars.next();
                current_literal.push('$');
            }
            '$' => match chars.peek() {
                Some('{') => {
                    chars.next(); // consume {

                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }

                    if !closed {
                        // Unterminated reference stays literal.
                        current_literal.push_str("${");
                        current_literal.push_str(&body);
                        continue;
                    }

                    if !current_literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                    }

                    let (name, default) = match body.split_once(':') {
                        Some((name, default)) => (name.to_string(), Some(default.to_string())),
                        None => (body, None),
                    };
                    segments.push(Segment::Variable { name, default });
                }
                Some(&next) if is_name_start(next) => {
                    if !current_literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                    }

                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if !is_name_char(c) {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    segments.push(Segment::Variable {
                        name,
                        default: None,
                    });
                }
                _ => current_literal.push(c),
            },
            _ => current_literal.push(c),
        }
    }

    if !current_literal.is_empty() {
        segments.push(Segment::Literal(current_literal));
    }

    segments
}

/// Expand every variable reference using `vars`.
pub fn expand_variables(input: &str, vars: &HashMap<String, String>) -> String {
    let mut result = String::new();

    for segment in parse_interpolation(input) {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Variable { name, default } => match vars.get(&name) {
                Some(value) => result.push_str(value),
                None => result.push_str(default.as_deref().unwrap_or_default()),
            },
        }
    }

    result
}
