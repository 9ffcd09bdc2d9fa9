//! Symbol table: allocation of hardware resource slots across the fully
//! inlined program.
//!
//! Allocation is first-declared, first-allocated within each kind's address
//! space. The table survives compilation and is returned with the program so
//! the renderer can bind textures and parameter values to the right slots
//! before drawing.

use std::fmt;

use super::error::{CallChain, CompileError};

/// The address spaces of an ARB fragment program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Temp,
    Param,
    Texture,
    Varying,
    Result,
}

impl ResourceKind {
    /// Platform ceiling for this kind, per the ARB_fragment_program
    /// guaranteed native minima.
    pub fn ceiling(self) -> u32 {
        match self {
            ResourceKind::Temp => 32,
            ResourceKind::Param => 24,
            ResourceKind::Texture => 16,
            ResourceKind::Varying => 8,
            ResourceKind::Result => 1,
        }
    }

    /// Program-text spelling of slot `slot` in this address space. Temps
    /// keep their textual names, so they have no slot address.
    pub fn address(self, slot: u32) -> Option<String> {
        match self {
            ResourceKind::Param => Some(format!("program.local[{slot}]")),
            ResourceKind::Texture => Some(format!("texture[{slot}]")),
            ResourceKind::Varying => Some(format!("fragment.texcoord[{slot}]")),
            ResourceKind::Result => Some("result.color".to_string()),
            ResourceKind::Temp => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Temp => "TEMP",
            ResourceKind::Param => "PARAM",
            ResourceKind::Texture => "TEXTURE",
            ResourceKind::Varying => "VARYING",
            ResourceKind::Result => "RESULT",
        };
        f.write_str(s)
    }
}

/// One resolved symbol: a (kind, name) pair and the slot it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub kind: ResourceKind,
    pub slot: u32,
}

/// Per-compilation symbol table. Bindings are recorded in allocation order,
/// which makes iteration (and therefore output) deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    bindings: Vec<Binding>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` in `kind`'s address space, allocating a slot on first
    /// use. `pinned` forces a specific slot (environment-pinned resources);
    /// a pin that contradicts an earlier resolution of the same symbol, or
    /// lands on a slot another symbol holds, is a [`CompileError::SlotConflict`].
    pub fn resolve(
        &mut self,
        kind: ResourceKind,
        name: &str,
        pinned: Option<u32>,
        chain: &CallChain,
    ) -> Result<u32, CompileError> {
        if let Some(existing) = self.find(kind, name) {
            if let Some(p) = pinned {
                if p != existing.slot {
                    return Err(CompileError::SlotConflict {
                        kind,
                        slot: p,
                        symbol: name.to_string(),
                        taken_by: name.to_string(),
                    });
                }
            }
            return Ok(existing.slot);
        }

        let slot = match pinned {
            Some(p) => {
                if let Some(holder) = self.holder_of(kind, p) {
                    return Err(CompileError::SlotConflict {
                        kind,
                        slot: p,
                        symbol: name.to_string(),
                        taken_by: holder.to_string(),
                    });
                }
                p
            }
            None => self.lowest_free(kind),
        };

        let limit = kind.ceiling();
        if slot >= limit {
            return Err(CompileError::ResourceExhausted {
                kind,
                limit,
                symbol: name.to_string(),
                chain: chain.clone(),
            });
        }

        self.bindings.push(Binding {
            name: name.to_string(),
            kind,
            slot,
        });
        Ok(slot)
    }

    /// All bindings in allocation order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn slot_of(&self, kind: ResourceKind, name: &str) -> Option<u32> {
        self.find(kind, name).map(|b| b.slot)
    }

    /// Number of live symbols of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.bindings.iter().filter(|b| b.kind == kind).count()
    }

    fn find(&self, kind: ResourceKind, name: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.kind == kind && b.name == name)
    }

    fn holder_of(&self, kind: ResourceKind, slot: u32) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.kind == kind && b.slot == slot)
            .map(|b| b.name.as_str())
    }

    fn lowest_free(&self, kind: ResourceKind) -> u32 {
        let mut slot = 0;
        while self.holder_of(kind, slot).is_some() {
            slot += 1;
        }
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> CallChain {
        CallChain::single("test.prog")
    }

    #[test]
    fn first_declared_first_allocated() {
        let mut table = SymbolTable::new();
        let a = table
            .resolve(ResourceKind::Param, "voxValXform", None, &chain())
            .unwrap();
        let b = table
            .resolve(ResourceKind::Param, "clipLo", None, &chain())
            .unwrap();
        assert_eq!((a, b), (0, 1));
        // Re-resolution is stable.
        assert_eq!(
            table
                .resolve(ResourceKind::Param, "voxValXform", None, &chain())
                .unwrap(),
            0
        );
    }

    #[test]
    fn pinned_slots_are_honored_and_skipped_by_auto_allocation() {
        let mut table = SymbolTable::new();
        table
            .resolve(ResourceKind::Texture, "lutTexture", Some(1), &chain())
            .unwrap();
        let auto = table
            .resolve(ResourceKind::Texture, "imageTexture", None, &chain())
            .unwrap();
        assert_eq!(auto, 0);
        let next = table
            .resolve(ResourceKind::Texture, "modulateTexture", None, &chain())
            .unwrap();
        assert_eq!(next, 2);
    }

    #[test]
    fn pin_onto_taken_slot_is_a_conflict() {
        let mut table = SymbolTable::new();
        table
            .resolve(ResourceKind::Texture, "imageTexture", Some(0), &chain())
            .unwrap();
        let err = table
            .resolve(ResourceKind::Texture, "lutTexture", Some(0), &chain())
            .unwrap_err();
        assert!(matches!(err, CompileError::SlotConflict { slot: 0, .. }));
    }

    #[test]
    fn ceiling_is_enforced() {
        let mut table = SymbolTable::new();
        for i in 0..ResourceKind::Varying.ceiling() {
            table
                .resolve(ResourceKind::Varying, &format!("v{i}"), None, &chain())
                .unwrap();
        }
        let err = table
            .resolve(ResourceKind::Varying, "one_too_many", None, &chain())
            .unwrap_err();
        match err {
            CompileError::ResourceExhausted { kind, symbol, .. } => {
                assert_eq!(kind, ResourceKind::Varying);
                assert_eq!(symbol, "one_too_many");
            }
            other => panic!("expected ResourceExhausted, got {other:?}"),
        }
    }

    #[test]
    fn addresses() {
        assert_eq!(
            ResourceKind::Param.address(3).as_deref(),
            Some("program.local[3]")
        );
        assert_eq!(ResourceKind::Texture.address(0).as_deref(), Some("texture[0]"));
        assert_eq!(
            ResourceKind::Varying.address(7).as_deref(),
            Some("fragment.texcoord[7]")
        );
        assert_eq!(
            ResourceKind::Result.address(0).as_deref(),
            Some("result.color")
        );
        assert_eq!(ResourceKind::Temp.address(0), None);
    }
}
