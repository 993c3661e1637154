//! Core element types for the semantic memory.
//!
//! Every node, link and connector in the memory is identified by an
//! [`ElementId`] and described by an [`ElementType`]. Connectors are
//! first-class elements: a connector can itself be the endpoint of another
//! connector, which is how relations (`nrel_*`, `rrel_*`) are attached.
//! The [`ElementAllocator`] provides thread-safe ID generation.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Unique, niche-optimized identifier for a memory element.
///
/// Uses `NonZeroU64` so that `Option<ElementId>` is the same size as `ElementId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ElementId(NonZeroU64);

impl ElementId {
    /// Create an `ElementId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ElementId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "el:{}", self.0)
    }
}

/// Whether an element is a constant fact or a pattern variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constancy {
    Const,
    Var,
}

/// Semantic subtype of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Plain,
    Tuple,
    Structure,
    Class,
    Role,
    NoRole,
}

/// Kind of a connector between two elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorKind {
    /// Permanent positive membership arc.
    PermPosArc,
    /// Temporary positive membership arc.
    TempPosArc,
    /// Permanent negative membership arc.
    PermNegArc,
    /// Directed common arc (carries `nrel_*` relations).
    CommonArc,
    /// Undirected common edge.
    CommonEdge,
}

impl ConnectorKind {
    /// Membership arcs are the arcs that say "target belongs to source".
    pub fn is_membership(self) -> bool {
        matches!(
            self,
            ConnectorKind::PermPosArc | ConnectorKind::TempPosArc | ConnectorKind::PermNegArc
        )
    }

    /// Undirected connectors match in both orientations.
    pub fn is_undirected(self) -> bool {
        self == ConnectorKind::CommonEdge
    }
}

/// Structural category of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Node(NodeKind),
    Link,
    Connector(ConnectorKind),
}

/// Full type of an element: its structural kind plus its constancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementType {
    pub kind: ElementKind,
    pub constancy: Constancy,
}

impl ElementType {
    pub const CONST_NODE: Self = Self::const_node(NodeKind::Plain);
    pub const VAR_NODE: Self = Self::var_node(NodeKind::Plain);
    pub const CONST_CLASS: Self = Self::const_node(NodeKind::Class);
    pub const CONST_TUPLE: Self = Self::const_node(NodeKind::Tuple);
    pub const CONST_STRUCTURE: Self = Self::const_node(NodeKind::Structure);
    pub const CONST_ROLE: Self = Self::const_node(NodeKind::Role);
    pub const CONST_NOROLE: Self = Self::const_node(NodeKind::NoRole);
    pub const CONST_LINK: Self = Self {
        kind: ElementKind::Link,
        constancy: Constancy::Const,
    };
    pub const VAR_LINK: Self = Self {
        kind: ElementKind::Link,
        constancy: Constancy::Var,
    };
    pub const CONST_PERM_POS_ARC: Self = Self::const_connector(ConnectorKind::PermPosArc);
    pub const VAR_PERM_POS_ARC: Self = Self::var_connector(ConnectorKind::PermPosArc);
    pub const CONST_TEMP_POS_ARC: Self = Self::const_connector(ConnectorKind::TempPosArc);
    pub const CONST_PERM_NEG_ARC: Self = Self::const_connector(ConnectorKind::PermNegArc);
    pub const CONST_COMMON_ARC: Self = Self::const_connector(ConnectorKind::CommonArc);
    pub const VAR_COMMON_ARC: Self = Self::var_connector(ConnectorKind::CommonArc);
    pub const CONST_COMMON_EDGE: Self = Self::const_connector(ConnectorKind::CommonEdge);

    pub const fn const_node(kind: NodeKind) -> Self {
        Self {
            kind: ElementKind::Node(kind),
            constancy: Constancy::Const,
        }
    }

    pub const fn var_node(kind: NodeKind) -> Self {
        Self {
            kind: ElementKind::Node(kind),
            constancy: Constancy::Var,
        }
    }

    pub const fn const_connector(kind: ConnectorKind) -> Self {
        Self {
            kind: ElementKind::Connector(kind),
            constancy: Constancy::Const,
        }
    }

    pub const fn var_connector(kind: ConnectorKind) -> Self {
        Self {
            kind: ElementKind::Connector(kind),
            constancy: Constancy::Var,
        }
    }

    pub fn is_const(self) -> bool {
        self.constancy == Constancy::Const
    }

    pub fn is_var(self) -> bool {
        self.constancy == Constancy::Var
    }

    pub fn is_node(self) -> bool {
        matches!(self.kind, ElementKind::Node(_))
    }

    pub fn is_link(self) -> bool {
        self.kind == ElementKind::Link
    }

    pub fn is_connector(self) -> bool {
        matches!(self.kind, ElementKind::Connector(_))
    }

    /// The connector kind, if this is a connector type.
    pub fn connector_kind(self) -> Option<ConnectorKind> {
        match self.kind {
            ElementKind::Connector(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_membership_arc(self) -> bool {
        self.connector_kind().is_some_and(ConnectorKind::is_membership)
    }

    /// Constant counterpart of this type, used when a variable is generated.
    pub fn as_const(self) -> Self {
        Self {
            kind: self.kind,
            constancy: Constancy::Const,
        }
    }

    /// Whether a pattern element of this type admits `candidate` as its value.
    ///
    /// Only constant elements are admitted. A plain node pattern admits any
    /// node; every other kind must match exactly.
    pub fn admits(self, candidate: ElementType) -> bool {
        if !candidate.is_const() {
            return false;
        }
        match (self.kind, candidate.kind) {
            (ElementKind::Node(NodeKind::Plain), ElementKind::Node(_)) => true,
            (expected, actual) => expected == actual,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let constancy = match self.constancy {
            Constancy::Const => "const",
            Constancy::Var => "var",
        };
        match self.kind {
            ElementKind::Node(kind) => write!(f, "{constancy} {kind:?} node"),
            ElementKind::Link => write!(f, "{constancy} link"),
            ElementKind::Connector(kind) => write!(f, "{constancy} {kind:?}"),
        }
    }
}

/// Thread-safe element ID allocator.
///
/// Produces monotonically increasing IDs starting from 1, so ID order is
/// creation order.
#[derive(Debug)]
pub struct ElementAllocator {
    next: AtomicU64,
}

impl ElementAllocator {
    /// Create a new allocator that starts from ID 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next element ID.
    pub fn next_id(&self) -> Result<ElementId, MemoryError> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        ElementId::new(raw).ok_or(MemoryError::AllocatorExhausted)
    }
}

impl Default for ElementAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<ElementId>>(),
            std::mem::size_of::<ElementId>()
        );
    }

    #[test]
    fn element_id_zero_is_none() {
        assert!(ElementId::new(0).is_none());
        assert_eq!(ElementId::new(42).unwrap().get(), 42);
        assert_eq!(ElementId::new(42).unwrap().to_string(), "el:42");
    }

    #[test]
    fn allocator_produces_sequential_ids() {
        let alloc = ElementAllocator::new();
        let a = alloc.next_id().unwrap();
        let b = alloc.next_id().unwrap();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert!(a < b);
    }

    #[test]
    fn plain_var_node_admits_any_const_node() {
        assert!(ElementType::VAR_NODE.admits(ElementType::CONST_CLASS));
        assert!(ElementType::VAR_NODE.admits(ElementType::CONST_STRUCTURE));
        assert!(!ElementType::VAR_NODE.admits(ElementType::CONST_LINK));
        assert!(!ElementType::VAR_NODE.admits(ElementType::VAR_NODE));
    }

    #[test]
    fn connector_patterns_match_exact_kind() {
        assert!(ElementType::VAR_PERM_POS_ARC.admits(ElementType::CONST_PERM_POS_ARC));
        assert!(!ElementType::VAR_PERM_POS_ARC.admits(ElementType::CONST_TEMP_POS_ARC));
        assert!(!ElementType::VAR_PERM_POS_ARC.admits(ElementType::VAR_PERM_POS_ARC));
    }

    #[test]
    fn membership_classification() {
        assert!(ElementType::CONST_TEMP_POS_ARC.is_membership_arc());
        assert!(ElementType::CONST_PERM_NEG_ARC.is_membership_arc());
        assert!(!ElementType::CONST_COMMON_ARC.is_membership_arc());
        assert!(!ElementType::CONST_NODE.is_membership_arc());
    }

    #[test]
    fn as_const_keeps_kind() {
        assert_eq!(ElementType::VAR_COMMON_ARC.as_const(), ElementType::CONST_COMMON_ARC);
        assert_eq!(ElementType::VAR_LINK.as_const(), ElementType::CONST_LINK);
    }
}
