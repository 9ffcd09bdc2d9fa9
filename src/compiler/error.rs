//! Compile-time errors. Every error is fatal to its compilation: no partial
//! program text is ever returned.

use std::fmt;

use thiserror::Error;

use super::symbols::ResourceKind;

/// The chain of templates being expanded when an error was raised, outermost
/// first. A chain of length one means the error occurred in the top-level
/// template itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallChain(pub Vec<String>);

impl CallChain {
    pub fn single(template: impl Into<String>) -> Self {
        CallChain(vec![template.into()])
    }

    /// The template in which the error actually occurred.
    pub fn innermost(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("<unknown>")
    }
}

impl fmt::Display for CallChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<unknown>");
        }
        f.write_str(&self.0.join(" -> "))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    /// A substitution or conditional referenced a name absent from the
    /// binding environment (or, inside a subroutine, from its call's
    /// formal/actual bindings).
    #[error("unbound symbol `{name}` in {chain}")]
    UnboundSymbol { name: String, chain: CallChain },

    /// A subroutine include/call chain revisited a template already being
    /// expanded.
    #[error("circular include of `{name}` via {chain}")]
    CircularInclude { name: String, chain: CallChain },

    /// Directive expansion exceeded the bounded depth.
    #[error("expansion depth limit ({limit}) exceeded in {chain}")]
    RecursionLimitExceeded { limit: usize, chain: CallChain },

    /// An `arb_call`'s keyword arguments did not exactly match the target
    /// subroutine's formal set.
    #[error(
        "arguments to `{callee}` do not match its formals in {chain}: \
         missing {missing:?}, unexpected {extra:?}"
    )]
    ArgumentMismatch {
        callee: String,
        chain: CallChain,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Allocating a symbol would exceed the platform ceiling for its kind.
    #[error("{kind} ceiling ({limit}) exceeded by `{symbol}` in {chain}")]
    ResourceExhausted {
        kind: ResourceKind,
        limit: u32,
        symbol: String,
        chain: CallChain,
    },

    /// Two symbols of the same kind were pinned (or pinned and allocated)
    /// onto the same slot.
    #[error("{kind} slot {slot} requested for `{symbol}` is already held by `{taken_by}`")]
    SlotConflict {
        kind: ResourceKind,
        slot: u32,
        symbol: String,
        taken_by: String,
    },

    /// `arb_call` named a subroutine that no `arb_include` declared first.
    #[error("call to `{name}` in {chain} without a prior arb_include")]
    UndeclaredSubroutine { name: String, chain: CallChain },

    /// The template store has no entry for the requested name.
    #[error("template `{name}` not found in store (referenced from {chain})")]
    UnknownTemplate { name: String, chain: CallChain },

    /// Malformed directive text: unterminated `{{`/`{%`, unbalanced
    /// `endif`, bad call syntax, and similar.
    #[error("syntax error in `{template}` line {line}: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },

    /// An assembled instruction used an opcode outside the recognized ARB
    /// fragment program instruction set.
    #[error("unknown instruction `{opcode}` on line {line} of `{template}`")]
    UnknownInstruction {
        template: String,
        opcode: String,
        line: usize,
    },

    /// Instructions appeared after the terminal `END`.
    #[error("code after END on line {line} of `{template}`")]
    TrailingCodeAfterEnd { template: String, line: usize },

    /// The assembled program never terminated with `END`.
    #[error("`{template}` has no END instruction")]
    MissingEnd { template: String },
}
