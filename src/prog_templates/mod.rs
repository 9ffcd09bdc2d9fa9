//! Built-in `.prog` template sources.
//!
//! These are data, not code: each is the source text of an ARB fragment
//! program template, compiled on demand by [`crate::compiler::compile`].
//! The subroutines in [`funcs`] only materialize where an `arb_call` names
//! them.

pub mod funcs;
pub mod label;
pub mod volume;

/// Every built-in template name, in lookup order.
pub const NAMES: &[&str] = &[
    "textest.prog",
    "glvolume_frag.prog",
    "gllabel_frag.prog",
];

/// Look up a built-in template source by its file-like name.
pub fn builtin(name: &str) -> Option<&'static str> {
    match name {
        "textest.prog" => Some(funcs::TEXTEST),
        "glvolume_frag.prog" => Some(volume::GLVOLUME_FRAG),
        "gllabel_frag.prog" => Some(label::GLLABEL_FRAG),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_name_resolves() {
        for name in NAMES {
            assert!(builtin(name).is_some(), "missing builtin {name}");
        }
        assert!(builtin("nope.prog").is_none());
    }
}
