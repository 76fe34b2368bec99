//! Query ledger: the ordered record of exchanges in a conversation.

use serde::{Deserialize, Serialize};

use super::model::{Query, QueryPatch};

/// Ordered, index-addressed record of question/answer exchanges.
///
/// Position is the addressing key for in-flight updates: a streaming
/// exchange resolves its target index once at dispatch time and keeps using
/// it even if the ledger grows while the stream is in flight.
///
/// The ledger performs no I/O; every operation is an in-memory mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryLedger(Vec<Query>);

impl QueryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger from an existing list of exchanges.
    pub fn from_queries(queries: Vec<Query>) -> Self {
        Self(queries)
    }

    /// Adds an exchange to the end; used when the user asks a new question.
    pub fn append(&mut self, query: Query) {
        self.0.push(query);
    }

    /// Wholesale replacement of the ledger; used when loading a persisted
    /// conversation or resetting to an empty one.
    pub fn replace_all(&mut self, queries: Vec<Query>) {
        self.0 = queries;
    }

    /// Shallow-merges `patch` into the entry at `index`.
    ///
    /// Addressing an index outside the current bounds is a no-op: the patch
    /// is dropped and a warning is logged. This can legitimately happen when
    /// a late transition races a ledger truncation.
    pub fn merge_partial(&mut self, index: usize, patch: QueryPatch) {
        let Some(entry) = self.0.get_mut(index) else {
            tracing::warn!(
                index,
                len = self.0.len(),
                "dropping partial update addressed outside the ledger"
            );
            return;
        };

        if let Some(question) = patch.question {
            entry.question = question;
        }
        if let Some(response) = patch.response {
            entry.response = response;
        }
        if let Some(sources) = patch.sources {
            entry.sources = Some(sources);
        }
        if let Some(error) = patch.error {
            entry.error = Some(error);
        }
    }

    /// Drops every entry from `index` onward, then appends `query`.
    ///
    /// For an in-bounds `index` the resulting length is `index + 1`. Used
    /// when the user edits and resends a historical question.
    pub fn truncate_and_append(&mut self, index: usize, query: Query) {
        self.0.truncate(index);
        self.0.push(query);
    }

    /// Returns the entry at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Query> {
        self.0.get(index)
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> Option<&mut Query> {
        self.0.get_mut(index)
    }

    /// Returns the last entry, if any.
    pub fn last(&self) -> Option<&Query> {
        self.0.last()
    }

    /// Number of exchanges in the ledger.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the ledger holds no exchanges.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read-only view of all exchanges.
    pub fn as_slice(&self) -> &[Query] {
        &self.0
    }

    /// Iterates over the exchanges in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Query> {
        self.0.iter()
    }
}

impl From<QueryLedger> for Vec<Query> {
    fn from(ledger: QueryLedger) -> Self {
        ledger.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_grows_the_ledger_in_order() {
        let mut ledger = QueryLedger::new();
        ledger.append(Query::new("first"));
        ledger.append(Query::new("second"));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(0).map(|q| q.question.as_str()), Some("first"));
        assert_eq!(ledger.get(1).map(|q| q.question.as_str()), Some("second"));
    }

    #[test]
    fn replace_all_discards_previous_entries() {
        let mut ledger = QueryLedger::from_queries(vec![Query::new("old")]);
        ledger.replace_all(vec![Query::new("a"), Query::new("b")]);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(0).map(|q| q.question.as_str()), Some("a"));
    }

    #[test]
    fn merge_partial_overwrites_only_given_fields() {
        let mut ledger = QueryLedger::from_queries(vec![Query::new("question")]);
        ledger.merge_partial(
            0,
            QueryPatch {
                response: Some("answer".to_string()),
                ..Default::default()
            },
        );

        let entry = ledger.get(0).expect("entry");
        assert_eq!(entry.question, "question");
        assert_eq!(entry.response, "answer");
        assert_eq!(entry.sources, None);
        assert_eq!(entry.error, None);
    }

    #[test]
    fn merge_partial_out_of_bounds_is_a_noop() {
        let mut ledger = QueryLedger::from_queries(vec![Query::new("only")]);
        let before = ledger.clone();

        ledger.merge_partial(
            5,
            QueryPatch {
                error: Some("lost".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(ledger, before);
    }

    #[test]
    fn truncate_and_append_yields_index_plus_one_entries() {
        let mut ledger = QueryLedger::from_queries(vec![
            Query::new("a"),
            Query::new("b"),
            Query::new("c"),
            Query::new("d"),
        ]);

        ledger.truncate_and_append(1, Query::new("b2"));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(0).map(|q| q.question.as_str()), Some("a"));
        assert_eq!(ledger.last().map(|q| q.question.as_str()), Some("b2"));
    }

    #[test]
    fn truncate_and_append_at_zero_keeps_only_the_new_entry() {
        let mut ledger = QueryLedger::from_queries(vec![Query::new("a"), Query::new("b")]);

        ledger.truncate_and_append(0, Query::new("fresh"));

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last().map(|q| q.question.as_str()), Some("fresh"));
    }
}
