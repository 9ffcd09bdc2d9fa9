//! First compilation phase: parse template text into structured segments.
//!
//! Literal assembly text is kept verbatim; `{{ }}` and `{% %}` directives
//! become structured [`Segment`]s so that the expansion phase can resolve
//! them against a binding environment without repeated string rewriting.

use super::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal program text, emitted as-is.
    Text(String),
    /// `{{ ident }}` substitution site.
    Subst { name: String, line: usize },
    /// `{{ arb_include('name.prog') }}` — declares a subroutine, emits nothing.
    Include { name: String, line: usize },
    /// `{{ arb_call('name.prog', formal='actual', ...) }}`.
    Call {
        name: String,
        args: Vec<(String, String)>,
        line: usize,
    },
    /// `{% if cond %} ... {% else %} ... {% endif %}`.
    If {
        cond: String,
        line: usize,
        then_body: Vec<Segment>,
        else_body: Vec<Segment>,
    },
}

/// Parse `text` (the source of template `template`) into segments.
pub fn parse(template: &str, text: &str) -> Result<Vec<Segment>, CompileError> {
    Parser { template, text }.run()
}

struct Parser<'a> {
    template: &'a str,
    text: &'a str,
}

/// An open `{% if %}` block being collected.
struct OpenIf {
    cond: String,
    line: usize,
    then_body: Vec<Segment>,
    else_body: Vec<Segment>,
    in_else: bool,
}

impl<'a> Parser<'a> {
    fn run(&self) -> Result<Vec<Segment>, CompileError> {
        let mut root: Vec<Segment> = Vec::new();
        let mut open: Vec<OpenIf> = Vec::new();
        let mut pos = 0;

        while let Some((start, kind)) = self.next_directive(pos) {
            if start > pos {
                push_text(current_body(&mut root, &mut open), &self.text[pos..start]);
            }
            let line = self.line_at(start);
            match kind {
                DirectiveKind::Subst => {
                    let end = self
                        .find_close(start + 2, "}}")
                        .ok_or_else(|| self.err(line, "unterminated {{ directive"))?;
                    let inner = self.text[start + 2..end].trim();
                    let segment = self.classify_subst(inner, line)?;
                    current_body(&mut root, &mut open).push(segment);
                    pos = end + 2;
                }
                DirectiveKind::Block => {
                    let end = self
                        .find_close(start + 2, "%}")
                        .ok_or_else(|| self.err(line, "unterminated {% directive"))?;
                    let inner = self.text[start + 2..end].trim();
                    self.handle_block(inner, line, &mut root, &mut open)?;
                    pos = end + 2;
                }
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(self.err(
                unclosed.line,
                &format!("{{% if {} %}} has no matching {{% endif %}}", unclosed.cond),
            ));
        }
        if pos < self.text.len() {
            push_text(&mut root, &self.text[pos..]);
        }
        Ok(root)
    }

    /// Find `close` starting at `from`, skipping over quoted strings so
    /// that directives inside `arb_call` argument values do not terminate
    /// the enclosing directive early.
    fn find_close(&self, from: usize, close: &str) -> Option<usize> {
        let mut quote: Option<char> = None;
        let mut i = from;
        while i < self.text.len() {
            let rest = &self.text[i..];
            let c = rest.chars().next()?;
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                }
                None => {
                    if c == '\'' || c == '"' {
                        quote = Some(c);
                    } else if rest.starts_with(close) {
                        return Some(i);
                    }
                }
            }
            i += c.len_utf8();
        }
        None
    }

    fn next_directive(&self, from: usize) -> Option<(usize, DirectiveKind)> {
        let rest = &self.text[from..];
        let subst = rest.find("{{");
        let block = rest.find("{%");
        match (subst, block) {
            (Some(s), Some(b)) if s < b => Some((from + s, DirectiveKind::Subst)),
            (Some(_) | None, Some(b)) => Some((from + b, DirectiveKind::Block)),
            (Some(s), None) => Some((from + s, DirectiveKind::Subst)),
            (None, None) => None,
        }
    }

    fn classify_subst(&self, inner: &str, line: usize) -> Result<Segment, CompileError> {
        // A directive keyword must be followed by its argument list;
        // otherwise the whole token is an ordinary substitution name
        // (`arb_callback`, say).
        if let Some(rest) = directive_args(inner, "arb_include") {
            let args = self.parse_paren_args(rest, line)?;
            let [name] = args.as_slice() else {
                return Err(self.err(line, "arb_include takes exactly one argument"));
            };
            let name = self.parse_quoted(name, line)?;
            return Ok(Segment::Include { name, line });
        }
        if let Some(rest) = directive_args(inner, "arb_call") {
            let raw_args = self.parse_paren_args(rest, line)?;
            let Some((first, kwargs)) = raw_args.split_first() else {
                return Err(self.err(line, "arb_call needs a subroutine name"));
            };
            let name = self.parse_quoted(first, line)?;
            let mut args = Vec::with_capacity(kwargs.len());
            for kw in kwargs {
                let Some((key, value)) = kw.split_once('=') else {
                    return Err(
                        self.err(line, &format!("arb_call argument `{kw}` is not key='value'"))
                    );
                };
                let key = key.trim();
                if !is_ident(key) {
                    return Err(
                        self.err(line, &format!("`{key}` is not a valid argument name"))
                    );
                }
                let value = self.parse_quoted(value, line)?;
                if args.iter().any(|(k, _)| k == key) {
                    return Err(self.err(line, &format!("duplicate argument `{key}`")));
                }
                args.push((key.to_string(), value));
            }
            return Ok(Segment::Call { name, args, line });
        }
        if !is_ident(inner) {
            return Err(self.err(line, &format!("`{inner}` is not a valid substitution name")));
        }
        Ok(Segment::Subst {
            name: inner.to_string(),
            line,
        })
    }

    fn handle_block(
        &self,
        inner: &str,
        line: usize,
        root: &mut Vec<Segment>,
        open: &mut Vec<OpenIf>,
    ) -> Result<(), CompileError> {
        if let Some(cond) = inner.strip_prefix("if ").map(str::trim) {
            if !is_ident(cond) {
                return Err(self.err(line, &format!("`{cond}` is not a valid condition name")));
            }
            open.push(OpenIf {
                cond: cond.to_string(),
                line,
                then_body: Vec::new(),
                else_body: Vec::new(),
                in_else: false,
            });
            return Ok(());
        }
        match inner {
            "else" => {
                let Some(top) = open.last_mut() else {
                    return Err(self.err(line, "{% else %} outside of {% if %}"));
                };
                if top.in_else {
                    return Err(self.err(line, "duplicate {% else %}"));
                }
                top.in_else = true;
                Ok(())
            }
            "endif" => {
                let Some(closed) = open.pop() else {
                    return Err(self.err(line, "{% endif %} outside of {% if %}"));
                };
                let segment = Segment::If {
                    cond: closed.cond,
                    line: closed.line,
                    then_body: closed.then_body,
                    else_body: closed.else_body,
                };
                current_body(root, open).push(segment);
                Ok(())
            }
            other => Err(self.err(line, &format!("unrecognized block directive `{other}`"))),
        }
    }

    /// Split `(a, b, c)` into top-level comma-separated pieces, respecting
    /// quotes.
    fn parse_paren_args(&self, rest: &str, line: usize) -> Result<Vec<String>, CompileError> {
        let rest = rest.trim();
        let Some(body) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) else {
            return Err(self.err(line, "expected a parenthesized argument list"));
        };
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        for c in body.chars() {
            match quote {
                Some(q) => {
                    current.push(c);
                    if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '\'' | '"' => {
                        quote = Some(c);
                        current.push(c);
                    }
                    ',' => {
                        pieces.push(current.trim().to_string());
                        current.clear();
                    }
                    _ => current.push(c),
                },
            }
        }
        if quote.is_some() {
            return Err(self.err(line, "unterminated quote in argument list"));
        }
        if !current.trim().is_empty() {
            pieces.push(current.trim().to_string());
        }
        Ok(pieces)
    }

    fn parse_quoted(&self, raw: &str, line: usize) -> Result<String, CompileError> {
        let raw = raw.trim();
        let quoted = (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
            || (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2);
        if !quoted {
            return Err(self.err(line, &format!("expected a quoted string, found `{raw}`")));
        }
        Ok(raw[1..raw.len() - 1].to_string())
    }

    fn line_at(&self, offset: usize) -> usize {
        self.text[..offset].bytes().filter(|b| *b == b'\n').count() + 1
    }

    fn err(&self, line: usize, message: &str) -> CompileError {
        CompileError::Syntax {
            template: self.template.to_string(),
            line,
            message: message.to_string(),
        }
    }
}

enum DirectiveKind {
    Subst,
    Block,
}

fn current_body<'b>(root: &'b mut Vec<Segment>, open: &'b mut Vec<OpenIf>) -> &'b mut Vec<Segment> {
    match open.last_mut() {
        Some(top) if top.in_else => &mut top.else_body,
        Some(top) => &mut top.then_body,
        None => root,
    }
}

/// The parenthesized argument list of `inner` when it invokes the directive
/// `keyword`, `None` when it is not that directive.
fn directive_args<'t>(inner: &'t str, keyword: &str) -> Option<&'t str> {
    let rest = inner.strip_prefix(keyword)?.trim_start();
    rest.starts_with('(').then_some(rest)
}

fn push_text(body: &mut Vec<Segment>, text: &str) {
    if let Some(Segment::Text(existing)) = body.last_mut() {
        existing.push_str(text);
    } else {
        body.push(Segment::Text(text.to_string()));
    }
}

pub(crate) fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
