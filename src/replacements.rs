//! Replacement tables: multi-valued variable bindings and their algebra.
//!
//! A [`Replacements`] table maps each variable to a column of values. Row
//! `i` across all columns is one joint binding. Every column always has
//! exactly [`Replacements::row_count`] values; the constructors and
//! combinators below are the only way to change a table, and all of them
//! keep that shape.
//!
//! A table may have rows but no keys: that is the single trivial binding a
//! fully constant pattern produces when it matches.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::element::ElementId;
use crate::template::TemplateParams;

/// Variable → column of bound values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    columns: BTreeMap<ElementId, Vec<ElementId>>,
    rows: usize,
}

impl Replacements {
    /// An empty table with no keys and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table over the given keys.
    pub fn with_keys(keys: impl IntoIterator<Item = ElementId>) -> Self {
        Self {
            columns: keys.into_iter().map(|k| (k, Vec::new())).collect(),
            rows: 0,
        }
    }

    /// Build a table over `keys` from binding rows.
    ///
    /// Rows lacking a value for one of the keys are skipped.
    pub fn from_params<'a>(
        keys: impl IntoIterator<Item = ElementId>,
        rows: impl IntoIterator<Item = &'a TemplateParams>,
    ) -> Self {
        let mut table = Self::with_keys(keys);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append one binding row. Keys of `row` outside the table are ignored.
    ///
    /// Returns `false`, leaving the table unchanged, if `row` misses a key.
    pub fn push_row(&mut self, row: &TemplateParams) -> bool {
        if !self.columns.keys().all(|k| row.contains_key(k)) {
            return false;
        }
        for (key, column) in &mut self.columns {
            column.push(row[key]);
        }
        self.rows += 1;
        true
    }

    /// Number of joint bindings.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// No rows: the bindings are unsatisfiable.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.columns.keys().copied()
    }

    pub fn key_set(&self) -> BTreeSet<ElementId> {
        self.keys().collect()
    }

    pub fn contains_key(&self, key: ElementId) -> bool {
        self.columns.contains_key(&key)
    }

    /// The column of values bound to `key`.
    pub fn column(&self, key: ElementId) -> Option<&[ElementId]> {
        self.columns.get(&key).map(Vec::as_slice)
    }

    /// Row `index` as a binding map.
    pub fn row(&self, index: usize) -> Option<TemplateParams> {
        (index < self.rows).then(|| {
            self.columns
                .iter()
                .map(|(key, column)| (*key, column[index]))
                .collect()
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = TemplateParams> + '_ {
        (0..self.rows).filter_map(|i| self.row(i))
    }

    /// One parameter object per row, ready for template search or generation.
    pub fn to_params_list(&self) -> Vec<TemplateParams> {
        self.rows().collect()
    }

    fn is_well_formed(&self) -> bool {
        self.columns.values().all(|c| c.len() == self.rows)
    }

    fn union_keys(&self, other: &Self) -> BTreeSet<ElementId> {
        self.keys().chain(other.keys()).collect()
    }

    fn common_keys(&self, other: &Self) -> Vec<ElementId> {
        self.keys().filter(|k| other.contains_key(*k)).collect()
    }

    fn agrees(&self, i: usize, other: &Self, j: usize, common: &[ElementId]) -> bool {
        common
            .iter()
            .all(|k| self.columns[k][i] == other.columns[k][j])
    }

    /// Natural join: every pair of rows that agrees on the common keys
    /// yields one row over the union of keys. Duplicate rows are dropped.
    pub fn intersect(&self, other: &Self) -> Self {
        debug_assert!(self.is_well_formed() && other.is_well_formed());
        let mut result = Self::with_keys(self.union_keys(other));
        if self.is_empty() || other.is_empty() {
            return result;
        }

        let common = self.common_keys(other);
        for i in 0..self.rows {
            for j in 0..other.rows {
                if !self.agrees(i, other, j, &common) {
                    continue;
                }
                for (key, column) in &mut result.columns {
                    let value = match self.columns.get(key) {
                        Some(mine) => mine[i],
                        None => other.columns[key][j],
                    };
                    column.push(value);
                }
                result.rows += 1;
            }
        }
        result.dedup_rows()
    }

    /// Cross union: each pair of rows yields two rows, one taking shared
    /// keys from `self`, one taking them from `other`. A side without keys
    /// or rows yields a copy of the other side.
    pub fn unite(&self, other: &Self) -> Self {
        debug_assert!(self.is_well_formed() && other.is_well_formed());
        if self.columns.is_empty() || self.is_empty() {
            return other.clone();
        }
        if other.columns.is_empty() || other.is_empty() {
            return self.clone();
        }

        // Value of `key` preferring `first` at row `fi`, else `second` at `si`.
        // Every key of the result belongs to at least one side.
        let pick = |first: &Self, fi: usize, second: &Self, si: usize, key: &ElementId| {
            match first.columns.get(key) {
                Some(column) => column[fi],
                None => second.columns[key][si],
            }
        };

        let mut result = Self::with_keys(self.union_keys(other));
        for i in 0..self.rows {
            for j in 0..other.rows {
                for (key, column) in &mut result.columns {
                    column.push(pick(self, i, other, j, key));
                    column.push(pick(other, j, self, i, key));
                }
                result.rows += 2;
            }
        }
        result
    }

    /// Anti-join: rows of `self` that agree with no row of `other` on the
    /// common keys.
    pub fn subtract(&self, other: &Self) -> Self {
        debug_assert!(self.is_well_formed() && other.is_well_formed());
        let common = self.common_keys(other);
        self.filter_rows(|i| !(0..other.rows).any(|j| self.agrees(i, other, j, &common)))
    }

    /// Drop every row that binds any key to one of `values`.
    pub fn remove_rows(&self, values: &HashSet<ElementId>) -> Self {
        self.filter_rows(|i| !self.columns.values().any(|c| values.contains(&c[i])))
    }

    /// Drop repeated rows, keeping first occurrences.
    pub fn dedup_rows(&self) -> Self {
        let mut seen = HashSet::new();
        let rows: Vec<Vec<ElementId>> = (0..self.rows)
            .map(|i| self.columns.values().map(|c| c[i]).collect())
            .collect();
        self.filter_rows(|i| seen.insert(rows[i].clone()))
    }

    /// Append the rows of `other`, dropping duplicates.
    ///
    /// Tables over the same keys are concatenated. Otherwise this falls back
    /// to [`unite`](Self::unite).
    pub fn extend_rows(&mut self, other: &Self) {
        if self.columns.is_empty() && self.is_empty() {
            *self = other.dedup_rows();
            return;
        }
        if self.key_set() != other.key_set() {
            *self = self.unite(other).dedup_rows();
            return;
        }
        for (key, column) in &mut self.columns {
            column.extend_from_slice(&other.columns[key]);
        }
        self.rows += other.rows;
        *self = self.dedup_rows();
    }

    fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let kept: Vec<usize> = (0..self.rows).filter(|i| keep(*i)).collect();
        Self {
            columns: self
                .columns
                .iter()
                .map(|(key, column)| (*key, kept.iter().map(|i| column[*i]).collect()))
                .collect(),
            rows: kept.len(),
        }
    }
}
