//! In-memory semantic graph store.
//!
//! Uses `petgraph` for adjacency and `DashMap` for element records, link
//! contents and system identifiers. Scans return triples in connector
//! creation order, which is the enumeration order the inference loop relies on.

use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::element::{ConnectorKind, ElementAllocator, ElementId, ElementType};
use crate::error::MemoryError;

use super::{AttributedTriple, Triple};

/// Result type for memory operations.
pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, Clone, Copy)]
struct ElementRecord {
    ty: ElementType,
    node: NodeIndex,
    /// Petgraph edge and endpoints, for connectors only.
    edge: Option<(EdgeIndex, ElementId, ElementId)>,
}

/// In-memory semantic graph.
///
/// Every element owns a petgraph node weighted by its [`ElementId`]; a
/// connector additionally owns an edge weighted by its own id.
pub struct Memory {
    graph: RwLock<StableDiGraph<ElementId, ElementId>>,
    /// ElementId → record for O(1) type and endpoint lookups.
    records: DashMap<ElementId, ElementRecord>,
    link_contents: DashMap<ElementId, String>,
    identifiers: DashMap<String, ElementId>,
    identifier_of: DashMap<ElementId, String>,
    allocator: ElementAllocator,
    connector_count: AtomicUsize,
}

impl Memory {
    /// Create a new empty memory.
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(StableDiGraph::new()),
            records: DashMap::new(),
            link_contents: DashMap::new(),
            identifiers: DashMap::new(),
            identifier_of: DashMap::new(),
            allocator: ElementAllocator::new(),
            connector_count: AtomicUsize::new(0),
        }
    }

    fn record(&self, element: ElementId) -> MemoryResult<ElementRecord> {
        self.records
            .get(&element)
            .map(|r| *r.value())
            .ok_or_else(|| MemoryError::ElementNotFound {
                element: element.to_string(),
            })
    }

    /// Create a node of the given node type.
    pub fn create_node(&self, ty: ElementType) -> MemoryResult<ElementId> {
        if !ty.is_node() {
            return Err(MemoryError::InvalidType {
                expected: "node type".into(),
                actual: ty.to_string(),
            });
        }
        self.insert_element(ty, None)
    }

    /// Create a constant link holding `content`.
    pub fn create_link(&self, content: impl Into<String>) -> MemoryResult<ElementId> {
        let id = self.insert_element(ElementType::CONST_LINK, None)?;
        self.link_contents.insert(id, content.into());
        Ok(id)
    }

    /// Create a variable link. Templates use its content as an equality
    /// constraint on the matched link.
    pub fn create_var_link(&self, content: impl Into<String>) -> MemoryResult<ElementId> {
        let id = self.insert_element(ElementType::VAR_LINK, None)?;
        self.link_contents.insert(id, content.into());
        Ok(id)
    }

    /// Create a connector of type `ty` from `source` to `target`.
    pub fn create_connector(
        &self,
        ty: ElementType,
        source: ElementId,
        target: ElementId,
    ) -> MemoryResult<ElementId> {
        if !ty.is_connector() {
            return Err(MemoryError::InvalidType {
                expected: "connector type".into(),
                actual: ty.to_string(),
            });
        }
        self.record(source)?;
        self.record(target)?;
        let id = self.insert_element(ty, Some((source, target)))?;
        self.connector_count.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    fn insert_element(
        &self,
        ty: ElementType,
        ends: Option<(ElementId, ElementId)>,
    ) -> MemoryResult<ElementId> {
        let id = self.allocator.next_id()?;
        let ends = match ends {
            Some((source, target)) => Some((
                source,
                target,
                self.record(source)?.node,
                self.record(target)?.node,
            )),
            None => None,
        };

        let record = {
            let mut graph = self.graph.write().expect("graph lock poisoned");
            let node = graph.add_node(id);
            let edge = ends.map(|(source, target, src_node, dst_node)| {
                (graph.add_edge(src_node, dst_node, id), source, target)
            });
            ElementRecord { ty, node, edge }
        };
        self.records.insert(id, record);
        Ok(id)
    }

    /// Erase an element and, transitively, every connector incident to it.
    ///
    /// Returns `false` if the element did not exist.
    pub fn erase_element(&self, element: ElementId) -> bool {
        if !self.records.contains_key(&element) {
            return false;
        }

        let mut doomed = Vec::new();
        {
            let graph = self.graph.read().expect("graph lock poisoned");
            let mut seen = HashSet::new();
            let mut stack = vec![element];
            while let Some(current) = stack.pop() {
                if !seen.insert(current) {
                    continue;
                }
                let Some(node) = self.records.get(&current).map(|r| r.node) else {
                    continue;
                };
                doomed.push(current);
                for direction in [Direction::Outgoing, Direction::Incoming] {
                    stack.extend(graph.edges_directed(node, direction).map(|e| *e.weight()));
                }
            }
        }

        let mut graph = self.graph.write().expect("graph lock poisoned");
        for id in doomed {
            let Some((_, record)) = self.records.remove(&id) else {
                continue;
            };
            if let Some((edge, _, _)) = record.edge {
                graph.remove_edge(edge);
                self.connector_count.fetch_sub(1, Ordering::Relaxed);
            }
            graph.remove_node(record.node);
            self.link_contents.remove(&id);
            if let Some((_, name)) = self.identifier_of.remove(&id) {
                self.identifiers.remove(&name);
            }
        }
        true
    }

    /// Check whether an element exists.
    pub fn is_element(&self, element: ElementId) -> bool {
        self.records.contains_key(&element)
    }

    /// Type of an element, if it exists.
    pub fn element_type(&self, element: ElementId) -> Option<ElementType> {
        self.records.get(&element).map(|r| r.ty)
    }

    /// Source and target of a connector.
    pub fn connector_ends(&self, connector: ElementId) -> Option<(ElementId, ElementId)> {
        self.records
            .get(&connector)
            .and_then(|r| r.edge.map(|(_, source, target)| (source, target)))
    }

    /// Scan connectors by pattern. `None` positions are wildcards.
    ///
    /// Undirected connectors are reported in both orientations. Results are
    /// ordered by connector creation.
    pub fn iterate3(
        &self,
        source: Option<ElementId>,
        kind: Option<ConnectorKind>,
        target: Option<ElementId>,
    ) -> Vec<Triple> {
        let guard = self.graph.read().expect("graph lock poisoned");
        let graph = &*guard;
        let kind_of = |connector: ElementId| {
            self.records
                .get(&connector)
                .and_then(|r| r.ty.connector_kind())
        };
        let accepts = |k: ConnectorKind| kind.is_none_or(|wanted| wanted == k);

        // Candidate (connector, stored source, stored target) edges.
        let edges: Vec<(ElementId, ElementId, ElementId)> = {
            let anchor = source.or(target);
            match anchor.and_then(|a| self.records.get(&a).map(|r| r.node)) {
                Some(node) => [Direction::Outgoing, Direction::Incoming]
                    .into_iter()
                    .flat_map(|d| graph.edges_directed(node, d))
                    .filter_map(|e| {
                        let src = *graph.node_weight(e.source())?;
                        let dst = *graph.node_weight(e.target())?;
                        Some((*e.weight(), src, dst))
                    })
                    .collect(),
                None if anchor.is_some() => return Vec::new(),
                None => graph
                    .edge_indices()
                    .filter_map(|ei| {
                        let (s, t) = graph.edge_endpoints(ei)?;
                        Some((
                            *graph.edge_weight(ei)?,
                            *graph.node_weight(s)?,
                            *graph.node_weight(t)?,
                        ))
                    })
                    .collect(),
            }
        };

        let matches = |t: &Triple| {
            source.is_none_or(|s| s == t.source) && target.is_none_or(|x| x == t.target)
        };

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (connector, src, dst) in edges {
            let Some(k) = kind_of(connector) else {
                continue;
            };
            if !accepts(k) {
                continue;
            }
            let forward = Triple::new(src, connector, dst);
            if matches(&forward) && seen.insert(forward) {
                out.push(forward);
            }
            if k.is_undirected() {
                let backward = Triple::new(dst, connector, src);
                if matches(&backward) && seen.insert(backward) {
                    out.push(backward);
                }
            }
        }
        out.sort_by_key(|t| (t.connector, t.source));
        out
    }

    /// Scan triples whose connector carries an attribute connector, e.g.
    /// `(formula, arc, root)` with `rrel_main_key_sc_element -> arc`.
    pub fn iterate5(
        &self,
        source: Option<ElementId>,
        kind: Option<ConnectorKind>,
        target: Option<ElementId>,
        attr_kind: Option<ConnectorKind>,
        attr: Option<ElementId>,
    ) -> Vec<AttributedTriple> {
        self.iterate3(source, kind, target)
            .into_iter()
            .flat_map(|triple| {
                self.iterate3(attr, attr_kind, Some(triple.connector))
                    .into_iter()
                    .map(move |a| AttributedTriple {
                        triple,
                        attr_connector: a.connector,
                        attr: a.source,
                    })
            })
            .collect()
    }

    /// Whether a connector of `kind` runs from `source` to `target`.
    pub fn check_connector(&self, source: ElementId, target: ElementId, kind: ConnectorKind) -> bool {
        !self.iterate3(Some(source), Some(kind), Some(target)).is_empty()
    }

    /// Whether `element` is a constant member of `set`.
    pub fn is_member(&self, set: ElementId, element: ElementId) -> bool {
        self.iterate3(Some(set), Some(ConnectorKind::PermPosArc), Some(element))
            .iter()
            .any(|t| self.element_type(t.connector).is_some_and(ElementType::is_const))
    }

    /// Content of a link.
    pub fn link_content(&self, link: ElementId) -> Option<String> {
        self.link_contents.get(&link).map(|c| c.value().clone())
    }

    /// Replace the content of a link.
    pub fn set_link_content(&self, link: ElementId, content: impl Into<String>) -> MemoryResult<()> {
        let ty = self.record(link)?.ty;
        if !ty.is_link() {
            return Err(MemoryError::InvalidType {
                expected: "link".into(),
                actual: ty.to_string(),
            });
        }
        self.link_contents.insert(link, content.into());
        Ok(())
    }

    /// Bind a unique system identifier to an element.
    pub fn set_system_identifier(&self, element: ElementId, name: &str) -> MemoryResult<()> {
        self.record(element)?;
        if let Some(existing) = self.identifiers.get(name).map(|e| *e.value()) {
            if existing == element {
                return Ok(());
            }
            return Err(MemoryError::DuplicateIdentifier {
                identifier: name.to_string(),
                element: existing.to_string(),
            });
        }
        if let Some((_, old)) = self.identifier_of.remove(&element) {
            self.identifiers.remove(&old);
        }
        self.identifiers.insert(name.to_string(), element);
        self.identifier_of.insert(element, name.to_string());
        Ok(())
    }

    /// Look up an element by system identifier.
    pub fn find_by_system_identifier(&self, name: &str) -> Option<ElementId> {
        self.identifiers.get(name).map(|e| *e.value())
    }

    /// System identifier of an element, if it has one.
    pub fn system_identifier(&self, element: ElementId) -> Option<String> {
        self.identifier_of.get(&element).map(|n| n.value().clone())
    }

    /// Find a node by identifier, or create it with type `ty`.
    pub fn resolve(&self, name: &str, ty: ElementType) -> MemoryResult<ElementId> {
        if let Some(existing) = self.find_by_system_identifier(name) {
            return Ok(existing);
        }
        let id = self.create_node(ty)?;
        self.set_system_identifier(id, name)?;
        Ok(id)
    }

    /// Human-readable label for logs: the identifier, else `el:<n>`.
    pub fn label(&self, element: ElementId) -> String {
        self.system_identifier(element)
            .unwrap_or_else(|| element.to_string())
    }

    /// Number of live elements (connectors included).
    pub fn element_count(&self) -> usize {
        self.records.len()
    }

    /// Number of live connectors.
    pub fn connector_count(&self) -> usize {
        self.connector_count.load(Ordering::Relaxed)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("elements", &self.element_count())
            .field("connectors", &self.connector_count())
            .finish()
    }
}
