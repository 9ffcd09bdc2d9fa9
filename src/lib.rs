//! `arbp` — a template compiler for ARB fragment programs.
//!
//! Volume renderers drive fixed-function-era GPUs with small assembly
//! fragment programs. This crate turns declarative `.prog` templates —
//! parameter placeholders, conditional blocks, and cross-file subroutine
//! inlining — into a single flat, valid ARB fragment program plus the
//! symbol -> hardware-slot binding table the renderer uses at draw time.
//!
//! ```
//! use arbp::{compile, BuiltinStore, Environment, ResourceKind, Value};
//!
//! let env = Environment::new()
//!     .with("texCoord", Value::varying())
//!     .with("imageTexture", Value::texture(0))
//!     .with("lutTexture", Value::texture(1))
//!     .with("voxValXform", Value::param())
//!     .with("invNumLabels", Value::Number(0.1))
//!     .with("texture_is_2d", Value::Bool(false))
//!     .with("outline", Value::Bool(false));
//!
//! let program = compile(&BuiltinStore, "gllabel_frag.prog", &env).unwrap();
//! assert!(program.text.ends_with("END\n"));
//! assert_eq!(program.slot_of(ResourceKind::Texture, "lutTexture"), Some(1));
//! ```

pub mod compiler;
pub mod env;
pub mod prog_templates;
pub mod store;

pub use compiler::{
    compile, Binding, CallChain, CompileError, CompiledProgram, ResourceKind, SymbolTable,
};
pub use env::{Environment, ResourceRef, Value};
pub use store::{BuiltinStore, DirStore, MemStore, TemplateStore};
