//! Reverse lookup from physics bodies to the gameplay objects that own them.
//!
//! Rapier bodies carry no payload of ours. Instead every body the subsystem
//! cares about gets a [`BodyKind`] in a side table keyed by its handle, and
//! hit-testing code matches on the kind.

use std::collections::HashMap;

use rapier3d::prelude::RigidBodyHandle;

use crate::types::{FragmentId, StructureId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// A free-standing gameplay target owned by the caller.
    Target(u64),
    /// The single merged collider of an unbroken structure.
    StructureStatic(StructureId),
    /// One debris fragment of a broken structure.
    StructurePart {
        structure: StructureId,
        fragment: FragmentId,
    },
    /// The training bust.
    Bust,
    /// A floating raft owned by the caller.
    Raft(u64),
}

impl BodyKind {
    /// Whether this kind is owned by the destruction subsystem itself.
    #[inline]
    pub fn is_structure(&self) -> bool {
        matches!(
            self,
            BodyKind::StructureStatic(_) | BodyKind::StructurePart { .. }
        )
    }
}

/// Which optional categories an enumeration or lookup includes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryFilter {
    pub include_bust: bool,
    pub include_rafts: bool,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            include_bust: true,
            include_rafts: false,
        }
    }
}

impl EntryFilter {
    pub fn all() -> Self {
        Self {
            include_bust: true,
            include_rafts: true,
        }
    }

    #[inline]
    pub fn admits(&self, kind: &BodyKind) -> bool {
        match kind {
            BodyKind::Bust => self.include_bust,
            BodyKind::Raft(_) => self.include_rafts,
            BodyKind::Target(_) | BodyKind::StructureStatic(_) | BodyKind::StructurePart { .. } => {
                true
            }
        }
    }
}

/// Something a weapon can hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollidableEntry {
    pub kind: BodyKind,
    pub body: RigidBodyHandle,
}

#[derive(Debug, Default)]
pub struct BodyRegistry {
    kinds: HashMap<RigidBodyHandle, BodyKind>,
}

impl BodyRegistry {
    pub fn insert(&mut self, body: RigidBodyHandle, kind: BodyKind) -> Option<BodyKind> {
        self.kinds.insert(body, kind)
    }

    pub fn remove(&mut self, body: RigidBodyHandle) -> Option<BodyKind> {
        self.kinds.remove(&body)
    }

    #[inline]
    pub fn get(&self, body: RigidBodyHandle) -> Option<BodyKind> {
        self.kinds.get(&body).copied()
    }

    /// Bodies registered by the caller (targets, bust, rafts).
    pub fn external(&self) -> impl Iterator<Item = CollidableEntry> + '_ {
        self.kinds
            .iter()
            .filter(|(_, kind)| !kind.is_structure())
            .map(|(body, kind)| CollidableEntry {
                kind: *kind,
                body: *body,
            })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
