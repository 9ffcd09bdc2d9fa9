//! The ARB fragment program template compiler.
//!
//! Compilation is a pure, synchronous transformation: (template name,
//! binding environment, template store) -> [`CompiledProgram`]. The
//! pipeline has three phases, each with its own module:
//!
//! 1. [`parse`] — directive text into structured segments,
//! 2. [`expand`] — substitution, conditionals, and subroutine inlining,
//! 3. [`assemble`] — structural validation of the flat instruction stream.
//!
//! Identical inputs always produce byte-identical output, so callers may
//! cache compiled programs by (template, environment) identity.

pub mod assemble;
pub mod error;
pub mod expand;
pub mod parse;
pub mod symbols;

pub use error::{CallChain, CompileError};
pub use expand::MAX_EXPANSION_DEPTH;
pub use symbols::{Binding, ResourceKind, SymbolTable};

use crate::env::Environment;
use crate::store::TemplateStore;

/// The terminal compilation artifact: flat program text plus the resolved
/// symbol table the renderer needs to bind textures and parameter values
/// before drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub text: String,
    pub symbols: SymbolTable,
}

impl CompiledProgram {
    /// Slot bound to `name` in `kind`'s address space, if any.
    pub fn slot_of(&self, kind: ResourceKind, name: &str) -> Option<u32> {
        self.symbols.slot_of(kind, name)
    }

    /// All resolved bindings in allocation order.
    pub fn bindings(&self) -> &[Binding] {
        self.symbols.bindings()
    }
}

/// Compile `template` against `env`, resolving template names through
/// `store`. Any failure aborts the whole compilation; no partial program
/// text is ever returned.
pub fn compile(
    store: &dyn TemplateStore,
    template: &str,
    env: &Environment,
) -> Result<CompiledProgram, CompileError> {
    let (text, mut symbols) = expand::expand_template(store, template, env)?;
    let text = assemble::assemble(template, &text, &mut symbols)?;
    log::debug!(
        "compiled `{template}`: {} lines, {} bindings",
        text.lines().count(),
        symbols.bindings().len()
    );
    Ok(CompiledProgram { text, symbols })
}
