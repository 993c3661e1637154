//! Visibility strategies for template search.
//!
//! A [`SearchScope`] decides which memory elements a match may contain and
//! which template links constrain the content of their matches. The
//! searcher picks one at construction time.

use std::fmt;

use crate::config::SearchType;
use crate::element::ElementId;
use crate::memory::Memory;

/// Element visibility for one search strategy.
pub trait SearchScope: Send + Sync {
    /// Short name for diagnostics and tracing.
    fn name(&self) -> &str;

    /// Whether `element` may be part of a match.
    fn is_visible(&self, memory: &Memory, structures: &[ElementId], element: ElementId) -> bool;

    /// Whether the content of template link `link` must equal the content
    /// of the link it matches.
    fn constrains_content(&self, memory: &Memory, structures: &[ElementId], link: ElementId) -> bool;
}

impl fmt::Debug for dyn SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SearchScope({})", self.name())
    }
}

fn in_any(memory: &Memory, structures: &[ElementId], element: ElementId) -> bool {
    structures.iter().any(|s| memory.is_member(*s, element))
}

/// Every element of memory is visible.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneralScope;

impl SearchScope for GeneralScope {
    fn name(&self) -> &str {
        "all_kb"
    }

    fn is_visible(&self, _memory: &Memory, _structures: &[ElementId], _element: ElementId) -> bool {
        true
    }

    fn constrains_content(&self, _memory: &Memory, _structures: &[ElementId], _link: ElementId) -> bool {
        true
    }
}

/// Only members of an input structure are visible, constants included.
#[derive(Debug, Default, Clone, Copy)]
pub struct InStructuresScope;

impl SearchScope for InStructuresScope {
    fn name(&self) -> &str {
        "in_structures"
    }

    fn is_visible(&self, memory: &Memory, structures: &[ElementId], element: ElementId) -> bool {
        in_any(memory, structures, element)
    }

    fn constrains_content(&self, memory: &Memory, structures: &[ElementId], link: ElementId) -> bool {
        in_any(memory, structures, link)
    }
}

/// Membership arcs must belong to an input structure; nodes, links and
/// non-membership connectors are always visible. Link content is not
/// checked in this scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct MembershipArcsInStructuresScope;

impl SearchScope for MembershipArcsInStructuresScope {
    fn name(&self) -> &str {
        "only_membership_arcs_in_structures"
    }

    fn is_visible(&self, memory: &Memory, structures: &[ElementId], element: ElementId) -> bool {
        let is_membership = memory
            .element_type(element)
            .is_some_and(|t| t.is_membership_arc());
        !is_membership || in_any(memory, structures, element)
    }

    fn constrains_content(&self, _memory: &Memory, _structures: &[ElementId], _link: ElementId) -> bool {
        false
    }
}

/// The scope a configured search type selects.
pub fn scope_for(search: SearchType) -> Box<dyn SearchScope> {
    match search {
        SearchType::AllKb => Box::new(GeneralScope),
        SearchType::InStructures => Box::new(InStructuresScope),
        SearchType::OnlyMembershipArcsInStructures => Box::new(MembershipArcsInStructuresScope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementType;

    #[test]
    fn visibility_per_scope() {
        let memory = Memory::new();
        let structure = memory.create_node(ElementType::CONST_STRUCTURE).unwrap();
        let inside = memory.create_node(ElementType::CONST_NODE).unwrap();
        let outside = memory.create_node(ElementType::CONST_NODE).unwrap();
        let free_arc = memory
            .create_connector(ElementType::CONST_PERM_POS_ARC, inside, outside)
            .unwrap();
        let common = memory
            .create_connector(ElementType::CONST_COMMON_ARC, inside, outside)
            .unwrap();
        memory
            .create_connector(ElementType::CONST_PERM_POS_ARC, structure, inside)
            .unwrap();
        let structures = [structure];

        let general = scope_for(SearchType::AllKb);
        assert!(general.is_visible(&memory, &structures, outside));

        let strict = scope_for(SearchType::InStructures);
        assert!(strict.is_visible(&memory, &structures, inside));
        assert!(!strict.is_visible(&memory, &structures, outside));
        assert!(!strict.is_visible(&memory, &structures, common));

        let arcs = scope_for(SearchType::OnlyMembershipArcsInStructures);
        assert!(arcs.is_visible(&memory, &structures, outside));
        assert!(arcs.is_visible(&memory, &structures, common));
        assert!(!arcs.is_visible(&memory, &structures, free_arc));
        assert_eq!(format!("{arcs:?}"), "SearchScope(only_membership_arcs_in_structures)");
    }

    #[test]
    fn content_constraints_per_scope() {
        let memory = Memory::new();
        let structure = memory.create_node(ElementType::CONST_STRUCTURE).unwrap();
        let link = memory.create_link("42").unwrap();
        let structures = [structure];

        assert!(GeneralScope.constrains_content(&memory, &structures, link));
        assert!(!InStructuresScope.constrains_content(&memory, &structures, link));
        memory
            .create_connector(ElementType::CONST_PERM_POS_ARC, structure, link)
            .unwrap();
        assert!(InStructuresScope.constrains_content(&memory, &structures, link));
        assert!(!MembershipArcsInStructuresScope.constrains_content(&memory, &structures, link));
    }
}
