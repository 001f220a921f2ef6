//! Pointer chain resolution.
//!
//! Walking a chain only proves the route is structurally intact (every
//! pointer read succeeded, nothing dereferenced NULL). Whether the resulting
//! address actually is the table it claims to be is for the caller's
//! plausibility probe to decide, which is what lets several version-specific
//! chains coexist in one schema.

use tracing::debug;

use crate::memory::ReadMemory;
use crate::schema::{PointerChain, TableKind};

/// Walk one chain to an absolute address.
///
/// Structural failure (unreadable base, NULL before a dereference) yields
/// `None`; resolution never raises.
pub fn resolve_chain<M: ReadMemory>(mem: &M, chain: &PointerChain) -> Option<u64> {
    let start = if chain.absolute {
        chain.base
    } else {
        mem.base_address().wrapping_add(chain.base)
    };
    if chain.direct {
        return Some(start.wrapping_add_signed(chain.final_offset));
    }

    let mut ptr = mem.read_u64(start).ok()?;
    for hop in &chain.hops {
        ptr = ptr.wrapping_add_signed(hop.offset);
        if hop.dereference {
            if ptr == 0 {
                return None;
            }
            ptr = mem.read_u64(ptr).ok()?;
        }
        ptr = ptr.wrapping_add_signed(hop.post_add);
    }
    Some(ptr.wrapping_add_signed(chain.final_offset))
}

/// Try candidates in declaration order, returning the first address that
/// resolves structurally and passes the caller's `accept` probe.
pub fn resolve_first<M, F>(mem: &M, kind: TableKind, chains: &[PointerChain], mut accept: F) -> Option<u64>
where
    M: ReadMemory,
    F: FnMut(u64) -> bool,
{
    for (i, chain) in chains.iter().enumerate() {
        let Some(address) = resolve_chain(mem, chain) else {
            debug!("{} chain {} did not resolve", kind, i);
            continue;
        };
        if accept(address) {
            debug!("{} base resolved to {:#x} via chain {}", kind, address, i);
            return Some(address);
        }
        debug!(
            "{} chain {} resolved to {:#x} but failed the probe",
            kind, i, address
        );
    }
    None
}

/// Cached absolute table addresses, one slot per kind.
///
/// The whole cache is dropped on every refresh; a populated cache is safe
/// for concurrent readers, repopulating it is not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedBases {
    player: Option<u64>,
    team: Option<u64>,
}

impl ResolvedBases {
    pub fn get(&self, kind: TableKind) -> Option<u64> {
        match kind {
            TableKind::Player => self.player,
            TableKind::Team => self.team,
        }
    }

    pub fn set(&mut self, kind: TableKind, address: u64) {
        match kind {
            TableKind::Player => self.player = Some(address),
            TableKind::Team => self.team = Some(address),
        }
    }

    /// Invalidate every cached base at once.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
