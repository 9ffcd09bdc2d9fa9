//! Second compilation phase: template expansion and subroutine inlining.
//!
//! Substitution sites and conditionals are resolved against the binding
//! environment; `arb_call` sites are replaced by the named subroutine's
//! body, expanded with an environment consisting only of that call's
//! formal/actual bindings. Internal scratch temporaries of an inlined
//! subroutine are renamed per call site so that sibling calls never alias.

use std::collections::BTreeSet;

use crate::env::{Environment, ResourceRef, Value};
use crate::store::TemplateStore;

use super::error::{CallChain, CompileError};
use super::parse::{self, Segment};
use super::symbols::{ResourceKind, SymbolTable};

/// Bound on directive expansion nesting (subroutine calls plus re-expansion
/// of substituted values). Rejects runaway self-reference in malformed
/// templates.
pub const MAX_EXPANSION_DEPTH: usize = 32;

/// Expand `template` against `env`, returning the flat (not yet validated)
/// program text and the symbol table accumulated along the way.
pub(crate) fn expand_template(
    store: &dyn TemplateStore,
    template: &str,
    env: &Environment,
) -> Result<(String, SymbolTable), CompileError> {
    let text = store
        .fetch(template)
        .ok_or_else(|| CompileError::UnknownTemplate {
            name: template.to_string(),
            chain: CallChain::single(template),
        })?;
    let segments = parse::parse(template, text)?;

    let mut expansion = Expansion {
        store,
        symbols: SymbolTable::new(),
        included: BTreeSet::new(),
        active: vec![template.to_string()],
        inline_counter: 0,
    };
    let mut out = String::new();
    expansion.expand_segments(&segments, env, 0, &mut out)?;
    Ok((out, expansion.symbols))
}

struct Expansion<'a> {
    store: &'a dyn TemplateStore,
    symbols: SymbolTable,
    /// Subroutines declared available by `arb_include`.
    included: BTreeSet<String>,
    /// Templates currently being expanded, outermost first.
    active: Vec<String>,
    /// Per-compilation counter making inlined scratch temps call-site unique.
    inline_counter: u32,
}

impl Expansion<'_> {
    fn chain(&self) -> CallChain {
        CallChain(self.active.clone())
    }

    fn expand_segments(
        &mut self,
        segments: &[Segment],
        env: &Environment,
        depth: usize,
        out: &mut String,
    ) -> Result<(), CompileError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(CompileError::RecursionLimitExceeded {
                limit: MAX_EXPANSION_DEPTH,
                chain: self.chain(),
            });
        }
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Subst { name, .. } => {
                    let rendered = self.render_value(name, env, depth)?;
                    out.push_str(&rendered);
                }
                Segment::Include { name, .. } => {
                    // Declares availability only; the body is materialized
                    // where called.
                    if self.store.fetch(name).is_none() {
                        return Err(CompileError::UnknownTemplate {
                            name: name.clone(),
                            chain: self.chain(),
                        });
                    }
                    self.included.insert(name.clone());
                }
                Segment::Call { name, args, .. } => {
                    self.inline_call(name, args, env, depth, out)?;
                }
                Segment::If {
                    cond,
                    then_body,
                    else_body,
                    ..
                } => {
                    let (value, _) = self.lookup(cond, env)?;
                    let taken = if value.is_truthy() {
                        then_body
                    } else {
                        else_body
                    };
                    // The discarded branch is dropped entirely: never
                    // emitted, never validated.
                    self.expand_segments(taken, env, depth, out)?;
                }
            }
        }
        Ok(())
    }

    /// Look `name` up in the environment. A `param_` / `texture_` /
    /// `varying_` prefix is stripped when the bare name is bound to a
    /// resource of the matching kind; the returned string is the symbolic
    /// name recorded in the binding table.
    fn lookup<'e>(
        &self,
        name: &str,
        env: &'e Environment,
    ) -> Result<(&'e Value, String), CompileError> {
        if let Some(value) = env.get(name) {
            return Ok((value, name.to_string()));
        }
        for (prefix, kind) in [
            ("param_", ResourceKind::Param),
            ("texture_", ResourceKind::Texture),
            ("varying_", ResourceKind::Varying),
        ] {
            let Some(bare) = name.strip_prefix(prefix) else {
                continue;
            };
            if let Some(value @ Value::Resource(r)) = env.get(bare) {
                if resource_kind(*r).0 == kind {
                    return Ok((value, bare.to_string()));
                }
            }
        }
        Err(CompileError::UnboundSymbol {
            name: name.to_string(),
            chain: self.chain(),
        })
    }

    fn render_value(
        &mut self,
        name: &str,
        env: &Environment,
        depth: usize,
    ) -> Result<String, CompileError> {
        let (value, symbolic) = self.lookup(name, env)?;
        match value {
            Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            Value::Number(n) => Ok(fmt_number(*n)),
            Value::Vector(v) => Ok(format!(
                "{{ {}, {}, {}, {} }}",
                fmt_number(v[0]),
                fmt_number(v[1]),
                fmt_number(v[2]),
                fmt_number(v[3])
            )),
            Value::Word(word) => {
                if has_directives(word) {
                    let word = word.clone();
                    self.expand_snippet(&word, env, depth + 1)
                } else {
                    Ok(word.clone())
                }
            }
            Value::Resource(r) => {
                let (kind, pinned) = resource_kind(*r);
                let slot = self.symbols.resolve(kind, &symbolic, pinned, &self.chain())?;
                // Param/Texture/Varying all have an address space; temps
                // (which never appear as environment resources) keep names.
                Ok(kind.address(slot).unwrap_or(symbolic))
            }
        }
    }

    /// Parse and expand a snippet of directive-bearing text (a `Word` value
    /// or a call actual) in the current context.
    fn expand_snippet(
        &mut self,
        snippet: &str,
        env: &Environment,
        depth: usize,
    ) -> Result<String, CompileError> {
        let template = self.chain().innermost().to_string();
        let segments = parse::parse(&template, snippet)?;
        let mut out = String::new();
        self.expand_segments(&segments, env, depth, &mut out)?;
        Ok(out)
    }

    fn inline_call(
        &mut self,
        callee: &str,
        args: &[(String, String)],
        env: &Environment,
        depth: usize,
        out: &mut String,
    ) -> Result<(), CompileError> {
        if !self.included.contains(callee) {
            return Err(CompileError::UndeclaredSubroutine {
                name: callee.to_string(),
                chain: self.chain(),
            });
        }
        if self.active.iter().any(|t| t == callee) {
            let mut revisited = self.active.clone();
            revisited.push(callee.to_string());
            return Err(CompileError::CircularInclude {
                name: callee.to_string(),
                chain: CallChain(revisited),
            });
        }
        let text = self
            .store
            .fetch(callee)
            .ok_or_else(|| CompileError::UnknownTemplate {
                name: callee.to_string(),
                chain: self.chain(),
            })?;
        // Internal temps are renamed before expansion, so a caller-supplied
        // actual that happens to share a callee temp's name can never alias
        // it.
        let site = self.inline_counter;
        self.inline_counter += 1;
        let text = rename_internal_temps(text, site);
        let segments = parse::parse(callee, &text)?;

        // The call's keyword arguments must exactly satisfy the callee's
        // formal set.
        let mut formals = BTreeSet::new();
        collect_formals(&segments, &mut formals)?;
        let supplied: BTreeSet<&str> = args.iter().map(|(k, _)| k.as_str()).collect();
        let missing: Vec<String> = formals
            .iter()
            .filter(|f| !supplied.contains(f.as_str()))
            .cloned()
            .collect();
        let extra: Vec<String> = supplied
            .iter()
            .filter(|s| !formals.contains(**s))
            .map(|s| s.to_string())
            .collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(CompileError::ArgumentMismatch {
                callee: callee.to_string(),
                chain: self.chain(),
                missing,
                extra,
            });
        }

        // Actuals are expanded in the caller's context; the callee then
        // sees nothing but its own formal/actual bindings, so nothing can
        // leak between sibling calls.
        let mut call_env = Environment::new();
        for (formal, actual) in args {
            let expanded = if has_directives(actual) {
                self.expand_snippet(actual, env, depth + 1)?
            } else {
                actual.clone()
            };
            call_env.set(formal, Value::Word(expanded));
        }

        self.active.push(callee.to_string());
        let mut body = String::new();
        let expanded = self.expand_segments(&segments, &call_env, depth + 1, &mut body);
        self.active.pop();
        expanded?;

        log::debug!(
            "inlined `{callee}` at site {site} ({} bindings) in {}",
            args.len(),
            self.chain()
        );
        out.push_str(&body);
        Ok(())
    }
}

fn resource_kind(r: ResourceRef) -> (ResourceKind, Option<u32>) {
    match r {
        ResourceRef::Param { slot } => (ResourceKind::Param, slot),
        ResourceRef::Texture { slot } => (ResourceKind::Texture, slot),
        ResourceRef::Varying { slot } => (ResourceKind::Varying, slot),
    }
}

fn has_directives(text: &str) -> bool {
    text.contains("{{") || text.contains("{%")
}

/// The formal parameter set of a subroutine: every name referenced by a
/// substitution site or conditional anywhere in its body, both branches
/// included.
fn collect_formals(
    segments: &[Segment],
    formals: &mut BTreeSet<String>,
) -> Result<(), CompileError> {
    for segment in segments {
        match segment {
            Segment::Text(_) | Segment::Include { .. } => {}
            Segment::Subst { name, .. } => {
                formals.insert(name.clone());
            }
            Segment::Call { name, args, .. } => {
                // Directives inside nested call actuals reference this
                // subroutine's formals.
                for (_, actual) in args {
                    if has_directives(actual) {
                        let nested = parse::parse(name, actual)?;
                        collect_formals(&nested, formals)?;
                    }
                }
            }
            Segment::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                formals.insert(cond.clone());
                collect_formals(then_body, formals)?;
                collect_formals(else_body, formals)?;
            }
        }
    }
    Ok(())
}

/// Rename every `TEMP` declared literally inside a subroutine body to a
/// call-site-unique name. Runs on the unexpanded source, so a temp declared
/// through a formal (`TEMP {{ out }};`) is untouched and keeps whatever name
/// the caller supplies, while the callee's own temps can never collide with
/// the caller's registers.
fn rename_internal_temps(body: &str, site: u32) -> String {
    let mut internal: Vec<String> = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        let Some(decl) = trimmed.strip_prefix("TEMP ") else {
            continue;
        };
        let decl = decl.trim_end_matches(';');
        for name in decl.split(',').map(str::trim) {
            if !parse::is_ident(name) {
                continue;
            }
            if !internal.iter().any(|n| n == name) {
                internal.push(name.to_string());
            }
        }
    }
    let mut renamed = body.to_string();
    for name in &internal {
        renamed = replace_ident(&renamed, name, &format!("{name}_inl{site}"));
    }
    renamed
}

/// Identifier-token-aware replacement: `from` is only replaced where it is
/// not part of a longer identifier.
fn replace_ident(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev_is_ident = false;
    while !rest.is_empty() {
        if !prev_is_ident && rest.starts_with(from) {
            let after = &rest[from.len()..];
            let at_boundary = after.chars().next().is_none_or(|c| !is_ident_char(c));
            if at_boundary {
                out.push_str(to);
                rest = after;
                prev_is_ident = true;
                continue;
            }
        }
        let Some(c) = rest.chars().next() else { break };
        out.push(c);
        prev_is_ident = is_ident_char(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Shortest clean decimal form for a numeric literal.
fn fmt_number(v: f64) -> String {
    if v.is_finite() {
        let s = format!("{v:.9}");
        let s = s.trim_end_matches('0').trim_end_matches('.');
        if s.is_empty() || s == "-" {
            "0".to_string()
        } else {
            s.to_string()
        }
    } else {
        "0".to_string()
    }
}
