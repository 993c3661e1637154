//! Relation conventions layered over raw connector scans.
//!
//! Role relations (`rrel_*`) are attached to membership arcs, non-role
//! relations (`nrel_*`) to common arcs. Both are read the same way: find a
//! connector leaving `source` that is itself a member of the relation.

use crate::element::{ConnectorKind, ElementId, ElementType, NodeKind};

use super::{Memory, MemoryResult};

/// Target of any connector from `source` that belongs to `relation`.
pub fn any_by_out_relation(
    memory: &Memory,
    source: ElementId,
    relation: ElementId,
) -> Option<ElementId> {
    all_by_out_relation(memory, source, relation).into_iter().next()
}

/// Targets of all connectors from `source` that belong to `relation`.
pub fn all_by_out_relation(memory: &Memory, source: ElementId, relation: ElementId) -> Vec<ElementId> {
    memory
        .iterate5(
            Some(source),
            None,
            None,
            Some(ConnectorKind::PermPosArc),
            Some(relation),
        )
        .into_iter()
        .map(|a| a.triple.target)
        .collect()
}

/// Constant members of `set` whose type satisfies `filter`, in arc order.
pub fn members(
    memory: &Memory,
    set: ElementId,
    filter: impl Fn(ElementType) -> bool,
) -> Vec<ElementId> {
    memory
        .iterate3(Some(set), Some(ConnectorKind::PermPosArc), None)
        .into_iter()
        .filter(|t| memory.element_type(t.connector).is_some_and(ElementType::is_const))
        .filter(|t| memory.element_type(t.target).is_some_and(&filter))
        .map(|t| t.target)
        .collect()
}

/// The member of `set` that follows `current` along `sequence`.
///
/// Sequences chain the membership arcs of the set:
/// `(set -> current) =>sequence: (set -> next)`.
pub fn next_in_sequence(
    memory: &Memory,
    set: ElementId,
    current: ElementId,
    sequence: ElementId,
) -> Option<ElementId> {
    memory
        .iterate3(Some(set), Some(ConnectorKind::PermPosArc), Some(current))
        .into_iter()
        .find_map(|arc| {
            memory
                .iterate5(
                    Some(arc.connector),
                    Some(ConnectorKind::CommonArc),
                    None,
                    Some(ConnectorKind::PermPosArc),
                    Some(sequence),
                )
                .into_iter()
                .find_map(|link| memory.connector_ends(link.triple.target))
                .filter(|(from, _)| *from == set)
                .map(|(_, next)| next)
        })
}

/// Create `source -> target` labelled with `relation`.
///
/// Role relations label a membership arc, every other relation labels a
/// common arc. Returns the labelled connector.
pub fn connect_by_relation(
    memory: &Memory,
    source: ElementId,
    target: ElementId,
    relation: ElementId,
) -> MemoryResult<ElementId> {
    let is_role = memory.element_type(relation) == Some(ElementType::const_node(NodeKind::Role));
    let ty = if is_role {
        ElementType::CONST_PERM_POS_ARC
    } else {
        ElementType::CONST_COMMON_ARC
    };
    let connector = memory.create_connector(ty, source, target)?;
    memory.create_connector(ElementType::CONST_PERM_POS_ARC, relation, connector)?;
    Ok(connector)
}

/// Chain two membership arcs of the same set with `sequence`.
pub fn link_in_sequence(
    memory: &Memory,
    previous_arc: ElementId,
    next_arc: ElementId,
    sequence: ElementId,
) -> MemoryResult<ElementId> {
    let link = memory.create_connector(ElementType::CONST_COMMON_ARC, previous_arc, next_arc)?;
    memory.create_connector(ElementType::CONST_PERM_POS_ARC, sequence, link)?;
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_and_norole_relations() {
        let memory = Memory::new();
        let rule = memory.create_node(ElementType::CONST_NODE).unwrap();
        let root = memory.create_node(ElementType::CONST_TUPLE).unwrap();
        let other = memory.create_node(ElementType::CONST_NODE).unwrap();
        let rrel = memory.create_node(ElementType::CONST_ROLE).unwrap();
        let nrel = memory.create_node(ElementType::CONST_NOROLE).unwrap();

        let arc = connect_by_relation(&memory, rule, root, rrel).unwrap();
        let common = connect_by_relation(&memory, rule, other, nrel).unwrap();

        assert_eq!(memory.element_type(arc), Some(ElementType::CONST_PERM_POS_ARC));
        assert_eq!(memory.element_type(common), Some(ElementType::CONST_COMMON_ARC));
        assert_eq!(any_by_out_relation(&memory, rule, rrel), Some(root));
        assert_eq!(any_by_out_relation(&memory, rule, nrel), Some(other));
        assert_eq!(any_by_out_relation(&memory, root, rrel), None);
    }

    #[test]
    fn sequence_walk() {
        let memory = Memory::new();
        let set = memory.create_node(ElementType::CONST_NODE).unwrap();
        let sequence = memory.create_node(ElementType::CONST_NOROLE).unwrap();
        let items: Vec<_> = (0..3)
            .map(|_| memory.create_node(ElementType::CONST_NODE).unwrap())
            .collect();
        let arcs: Vec<_> = items
            .iter()
            .map(|i| {
                memory
                    .create_connector(ElementType::CONST_PERM_POS_ARC, set, *i)
                    .unwrap()
            })
            .collect();
        link_in_sequence(&memory, arcs[0], arcs[1], sequence).unwrap();
        link_in_sequence(&memory, arcs[1], arcs[2], sequence).unwrap();

        assert_eq!(next_in_sequence(&memory, set, items[0], sequence), Some(items[1]));
        assert_eq!(next_in_sequence(&memory, set, items[1], sequence), Some(items[2]));
        assert_eq!(next_in_sequence(&memory, set, items[2], sequence), None);
    }

    #[test]
    fn members_skip_variable_arcs() {
        let memory = Memory::new();
        let set = memory.create_node(ElementType::CONST_STRUCTURE).unwrap();
        let a = memory.create_node(ElementType::CONST_NODE).unwrap();
        let b = memory.create_node(ElementType::CONST_NODE).unwrap();
        let link = memory.create_link("text").unwrap();
        memory
            .create_connector(ElementType::CONST_PERM_POS_ARC, set, a)
            .unwrap();
        memory
            .create_connector(ElementType::VAR_PERM_POS_ARC, set, b)
            .unwrap();
        memory
            .create_connector(ElementType::CONST_PERM_POS_ARC, set, link)
            .unwrap();

        assert_eq!(members(&memory, set, ElementType::is_node), vec![a]);
        assert_eq!(members(&memory, set, |_| true), vec![a, link]);
    }
}
