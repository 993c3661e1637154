//! Semantic memory: typed nodes, links and connectors in one graph.
//!
//! - **Store** ([`Memory`]): `petgraph` adjacency plus `DashMap` element records
//! - **Relations** ([`relations`]): the `rrel_*`/`nrel_*` conventions the engine
//!   uses to read formula sets, sequences and role arguments
//!
//! Connectors are elements too. Each one owns a petgraph node (so it can be
//! the endpoint of other connectors) and a petgraph edge between its ends.

pub mod relations;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::element::ElementId;

pub use store::{Memory, MemoryResult};

/// A `(source, connector, target)` triple produced by a memory scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Element the connector starts from.
    pub source: ElementId,
    /// The connector itself.
    pub connector: ElementId,
    /// Element the connector points to.
    pub target: ElementId,
}

impl Triple {
    pub fn new(source: ElementId, connector: ElementId, target: ElementId) -> Self {
        Self {
            source,
            connector,
            target,
        }
    }

    /// The three elements in pattern order.
    pub fn elements(&self) -> [ElementId; 3] {
        [self.source, self.connector, self.target]
    }
}

/// A triple whose connector is itself the target of an attribute connector,
/// e.g. `formula -> root` carried by `rrel_main_key_sc_element -> (that arc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributedTriple {
    pub triple: Triple,
    /// Connector from the attribute to `triple.connector`.
    pub attr_connector: ElementId,
    /// The attribute (relation) element.
    pub attr: ElementId,
}
