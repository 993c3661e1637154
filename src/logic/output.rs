//! The output structure an inference run fills with its constructions.

use std::collections::HashSet;

use crate::element::{ElementId, ElementType};
use crate::memory::{Memory, MemoryResult, relations};

/// A structure plus an in-process copy of its member set, so repeated
/// additions do not rescan memory.
#[derive(Debug, Clone)]
pub struct OutputStructure {
    element: ElementId,
    members: HashSet<ElementId>,
}

impl OutputStructure {
    /// Wrap `element`, reading the members it already has.
    pub fn load(memory: &Memory, element: ElementId) -> Self {
        Self {
            element,
            members: relations::members(memory, element, |_| true)
                .into_iter()
                .collect(),
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.members.contains(&element)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add `element` unless it is already a member. Returns whether it was added.
    pub fn add(&mut self, memory: &Memory, element: ElementId) -> MemoryResult<bool> {
        if self.members.contains(&element) {
            return Ok(false);
        }
        memory.create_connector(ElementType::CONST_PERM_POS_ARC, self.element, element)?;
        self.members.insert(element);
        Ok(true)
    }

    /// Add every element of a construction. Returns how many were new.
    pub fn add_all(&mut self, memory: &Memory, elements: &[ElementId]) -> MemoryResult<usize> {
        let mut added = 0;
        for element in elements {
            if self.add(memory, *element)? {
                added += 1;
            }
        }
        Ok(added)
    }
}
