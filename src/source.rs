//! Subject sources
//!
//! Analyses pull subject records from a [`SubjectSource`]. The scoring code
//! never performs I/O itself; a source may be backed by a remote store, a
//! directory of uploads or, as here, records held in memory.

use crate::adapters::SubjectPayloadAdapter;
use crate::error::ScoreError;
use crate::types::SubjectRecord;

/// Provider of subject records
pub trait SubjectSource {
    /// Every subject the source knows about
    fn fetch_subjects(&self) -> Result<Vec<SubjectRecord>, ScoreError>;

    /// Subjects named by id or name, in the order requested
    ///
    /// Unknown keys are skipped. A subject named by several keys is returned
    /// once, at its first mention.
    fn fetch_subjects_by_ids(&self, ids: &[String]) -> Result<Vec<SubjectRecord>, ScoreError>;
}

/// Source over records already loaded in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<SubjectRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<SubjectRecord>) -> Self {
        Self { records }
    }

    /// Load records through an adapter
    pub fn from_adapter(
        adapter: &dyn SubjectPayloadAdapter,
        raw_json: &str,
    ) -> Result<Self, ScoreError> {
        Ok(Self::new(adapter.parse(raw_json)?))
    }

    /// Add records from another document
    pub fn extend(&mut self, records: impl IntoIterator<Item = SubjectRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[SubjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SubjectSource for InMemorySource {
    fn fetch_subjects(&self) -> Result<Vec<SubjectRecord>, ScoreError> {
        Ok(self.records.clone())
    }

    fn fetch_subjects_by_ids(&self, ids: &[String]) -> Result<Vec<SubjectRecord>, ScoreError> {
        let mut positions: Vec<usize> = Vec::new();
        for key in ids {
            if let Some(position) = self.records.iter().position(|r| r.matches(key)) {
                if !positions.contains(&position) {
                    positions.push(position);
                }
            }
        }
        Ok(positions
            .into_iter()
            .map(|position| self.records[position].clone())
            .collect())
    }
}
