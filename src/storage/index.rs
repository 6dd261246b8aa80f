use crate::{
    storage::relation::DbRelation,
    types::{error::DatabaseError, handle::Handle, value::ValueDict},
};

/// A secondary access path over one relation. The relation is passed in by
/// the caller on every call that needs to read rows from it.
pub trait DbIndex {
    /// Create the index storage and load every row currently in `relation`.
    fn create(&mut self, relation: &dyn DbRelation) -> Result<(), DatabaseError>;
    /// Remove the index storage (SQL `DROP INDEX`).
    fn destroy(&mut self) -> Result<(), DatabaseError>;
    fn open(&mut self) -> Result<(), DatabaseError>;
    fn close(&mut self);

    /// Handles of rows whose key columns equal the values in `key_dict`.
    fn lookup(&self, key_dict: &ValueDict) -> Result<Vec<Handle>, DatabaseError>;
    fn range(
        &self,
        min_key: Option<&ValueDict>,
        max_key: Option<&ValueDict>,
    ) -> Result<Vec<Handle>, DatabaseError>;

    /// Index the row at `handle`, which must already exist in `relation`.
    fn insert(&mut self, relation: &dyn DbRelation, handle: Handle) -> Result<(), DatabaseError>;
    fn del(&mut self, handle: Handle) -> Result<(), DatabaseError>;
}
