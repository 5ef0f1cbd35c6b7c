// Deduplicated mapping accumulator
//
// Records keep insertion order. The first record for a
// (solution, connector, table) key wins; uniqueness is computed once every
// record is in.

use crate::model::TableMapping;
use std::collections::HashMap;

type Key = (String, String, String);

/// What happened to a record handed to [`MappingSet::insert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Same key from the same origin file; dropped silently
    Repeated,
    /// Same key already contributed by another file; dropped
    Duplicate { first_origin: String },
}

#[derive(Debug, Default)]
pub struct MappingSet {
    records: Vec<TableMapping>,
    origins: HashMap<Key, String>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record contributed by `origin` (the file it came from)
    pub fn insert(&mut self, mapping: TableMapping, origin: &str) -> InsertOutcome {
        let (solution, connector_id, table_name) = mapping.key();
        let key = (
            solution.to_string(),
            connector_id.to_string(),
            table_name.to_string(),
        );

        if let Some(first) = self.origins.get(&key) {
            return if first == origin {
                InsertOutcome::Repeated
            } else {
                InsertOutcome::Duplicate {
                    first_origin: first.clone(),
                }
            };
        }

        self.origins.insert(key, origin.to_string());
        self.records.push(mapping);
        InsertOutcome::Inserted
    }

    /// Set `is_unique` on every record and hand them back in insertion order
    pub fn finish(self) -> Vec<TableMapping> {
        let flags: Vec<bool> = {
            let counts = table_counts(&self.records);
            self.records
                .iter()
                .map(|m| counts.get(m.table_name.as_str()) == Some(&1))
                .collect()
        };

        self.records
            .into_iter()
            .zip(flags)
            .map(|(mut m, unique)| {
                m.is_unique = unique;
                m
            })
            .collect()
    }
}

/// Number of mappings referencing each table name
pub fn table_counts(mappings: &[TableMapping]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for m in mappings {
        *counts.entry(m.table_name.as_str()).or_insert(0) += 1;
    }
    counts
}
