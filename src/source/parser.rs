//! Layer source parser.
//!
//! Accepts two line-oriented override syntaxes, freely mixed:
//!
//! - `ENABLE NAME` / `DISABLE NAME`
//! - C preprocessor overrides: `#define NAME`, `#undef NAME`, and valued
//!   `#define NAME VALUE` constants
//!
//! Blank lines, `//` comments, `/* */` comments (which may span lines) and
//! lines where `#` is followed by whitespace (or nothing) are ignored.
//! Comment markers inside `"..."` or `'...'` literals are kept as value text.

use flagstack_resolver::{Assertion, FlagState, Setting};
use regex_lite::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Syntax errors in a layer source. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("line {line}: invalid flag name '{name}'")]
    InvalidName { line: usize, name: String },

    #[error("line {line}: unsupported directive '#{directive}'")]
    UnsupportedDirective { line: usize, directive: String },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unterminated block comment")]
    UnterminatedComment { line: usize },

    #[error("line {line}: invalid UTF-8")]
    Encoding { line: usize },
}

/// What one meaningful line asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Assert(Assertion),
    Set(Setting),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub line: usize,
    pub directive: Directive,
}

/// Directives of one layer source in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSource {
    pub lines: Vec<SourceLine>,
}

impl ParsedSource {
    pub fn assertions(&self) -> impl Iterator<Item = &Assertion> {
        self.lines.iter().filter_map(|l| match &l.directive {
            Directive::Assert(a) => Some(a),
            Directive::Set(_) => None,
        })
    }

    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.lines.iter().filter_map(|l| match &l.directive {
            Directive::Set(s) => Some(s),
            Directive::Assert(_) => None,
        })
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

/// Whether `name` is a valid flag or setting identifier.
pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

/// Parse a layer source into directives.
pub fn parse_layer_source(text: &str) -> Result<ParsedSource, SourceError> {
    let mut parsed = ParsedSource::default();
    let mut comment_opened_at: Option<usize> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if comment_opened_at.is_none() && is_hash_comment(raw.trim()) {
            continue;
        }

        let code = strip_comments(raw, line, &mut comment_opened_at)?;
        let code = code.trim();
        if code.is_empty() {
            continue;
        }

        if let Some(directive) = parse_line(code, line)? {
            parsed.lines.push(SourceLine { line, directive });
        }
    }

    if let Some(line) = comment_opened_at {
        return Err(SourceError::UnterminatedComment { line });
    }

    Ok(parsed)
}

/// `#` followed by whitespace, another `#`, or nothing.
fn is_hash_comment(code: &str) -> bool {
    match code.strip_prefix('#') {
        Some(rest) => {
            rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with('#')
        }
        None => false,
    }
}

/// Remove `//` and `/* */` comments from one line, tracking block comments
/// that continue past the end of the line. Quoted literals are copied
/// through untouched and must close on the same line.
fn strip_comments(
    raw: &str,
    line: usize,
    open_block: &mut Option<usize>,
) -> Result<String, SourceError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if open_block.is_some() {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *open_block = None;
                out.push(' ');
            }
            continue;
        }

        if let Some(delimiter) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == delimiter {
                quote = None;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('/')) => return Ok(out),
            ('/', Some('*')) => {
                chars.next();
                *open_block = Some(line);
            }
            ('"' | '\'', _) => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if quote.is_some() {
        return Err(SourceError::Syntax {
            line,
            message: "unterminated string literal".to_string(),
        });
    }
    Ok(out)
}

fn parse_line(code: &str, line: usize) -> Result<Option<Directive>, SourceError> {
    // Also catches `/* x */ # text`, which only becomes a hash comment once stripped.
    if is_hash_comment(code) {
        return Ok(None);
    }
    if let Some(after_hash) = code.strip_prefix('#') {
        return parse_preprocessor(after_hash, line);
    }

    let mut tokens = code.split_whitespace();
    let keyword = tokens.next().unwrap_or_default();
    let state = match keyword {
        "ENABLE" => FlagState::Enabled,
        "DISABLE" => FlagState::Disabled,
        _ => {
            return Err(SourceError::Syntax {
                line,
                message: format!("expected ENABLE or DISABLE, found '{}'", keyword),
            });
        }
    };

    let name = tokens.next().ok_or_else(|| SourceError::Syntax {
        line,
        message: format!("{} requires a flag name", keyword),
    })?;
    if let Some(extra) = tokens.next() {
        return Err(SourceError::Syntax {
            line,
            message: format!("unexpected '{}' after flag name", extra),
        });
    }

    Ok(Some(Directive::Assert(Assertion::new(checked_name(name, line)?, state))))
}

fn parse_preprocessor(after_hash: &str, line: usize) -> Result<Option<Directive>, SourceError> {
    let (keyword, rest) = split_token(after_hash);

    match keyword {
        "define" => {
            let (name, value) = split_token(rest);
            if name.is_empty() {
                return Err(SourceError::Syntax {
                    line,
                    message: "#define requires a name".to_string(),
                });
            }
            let name = checked_name(name, line)?;
            let value = value.trim();
            if value.is_empty() {
                Ok(Some(Directive::Assert(Assertion::enable(name))))
            } else {
                Ok(Some(Directive::Set(Setting::new(name, value))))
            }
        }
        "undef" => {
            let (name, extra) = split_token(rest);
            if name.is_empty() {
                return Err(SourceError::Syntax {
                    line,
                    message: "#undef requires a name".to_string(),
                });
            }
            if !extra.trim().is_empty() {
                return Err(SourceError::Syntax {
                    line,
                    message: format!("unexpected '{}' after #undef name", extra.trim()),
                });
            }
            Ok(Some(Directive::Assert(Assertion::disable(checked_name(name, line)?))))
        }
        other => Err(SourceError::UnsupportedDirective {
            line,
            directive: other.to_string(),
        }),
    }
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], &s[end..]),
        None => (s, ""),
    }
}

fn checked_name(name: &str, line: usize) -> Result<&str, SourceError> {
    if is_valid_name(name) {
        Ok(name)
    } else {
        Err(SourceError::InvalidName {
            line,
            name: name.to_string(),
        })
    }
}
