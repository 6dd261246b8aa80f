use tracing::debug;

use crate::{
    storage::{env::DbEnv, heap_file::HeapFile, schema::TableSchema},
    types::{
        MAX_RECORD_SIZE,
        error::DatabaseError,
        handle::Handle,
        page::SlottedPage,
        row::{marshal_values, unmarshal_values},
        value::{ColumnAttribute, DataType, ValueDict},
    },
};

/// Operations every relation offers to the statement layer and to indexes.
pub trait DbRelation {
    fn schema(&self) -> &TableSchema;

    fn create(&mut self) -> Result<(), DatabaseError>;
    fn create_if_not_exists(&mut self) -> Result<(), DatabaseError>;
    /// Remove the relation's storage (SQL `DROP TABLE`).
    fn destroy(&mut self) -> Result<(), DatabaseError>;
    fn open(&mut self) -> Result<(), DatabaseError>;
    fn close(&mut self);

    fn insert(&mut self, row: &ValueDict) -> Result<Handle, DatabaseError>;
    fn update(&mut self, handle: Handle, new_values: &ValueDict) -> Result<(), DatabaseError>;
    fn del(&mut self, handle: Handle) -> Result<(), DatabaseError>;

    /// Handles of every row matching all `column = value` pairs of
    /// `where_clause` (every row when `None`).
    fn select(&self, where_clause: Option<&ValueDict>) -> Result<Vec<Handle>, DatabaseError>;
    fn project(&self, handle: Handle) -> Result<ValueDict, DatabaseError>;
    fn project_columns(
        &self,
        handle: Handle,
        columns: &[String],
    ) -> Result<ValueDict, DatabaseError>;

    fn table_name(&self) -> &str {
        &self.schema().table_name
    }

    fn column_names(&self) -> Vec<String> {
        self.schema().column_names()
    }

    /// Attributes of `columns`, in the order given.
    fn column_attributes(&self, columns: &[String]) -> Result<Vec<ColumnAttribute>, DatabaseError> {
        columns
            .iter()
            .map(|name| Ok(self.schema().require_column(name)?.attribute))
            .collect()
    }
}

/// Heap-organized table: rows are appended to the last block of a
/// [`HeapFile`] and found again only by scanning.
#[derive(Debug)]
pub struct HeapTable {
    schema: TableSchema,
    column_types: Vec<DataType>,
    file: HeapFile,
}

impl HeapTable {
    pub fn new(
        env: &DbEnv,
        table_name: impl Into<String>,
        columns: Vec<(String, DataType)>,
    ) -> Result<Self, DatabaseError> {
        let schema = TableSchema::new(table_name, columns)?;
        let column_types = schema.columns.iter().map(|col| col.data_type()).collect();
        let file = HeapFile::new(env, schema.table_name.clone());
        Ok(Self {
            schema,
            column_types,
            file,
        })
    }

    pub fn is_open(&self) -> bool {
        self.file.is_open()
    }

    /// Marshal `row` in column order after validating it against the schema.
    pub fn marshal(&self, row: &ValueDict) -> Result<Vec<u8>, DatabaseError> {
        let values = self.schema.validate_row(row)?;
        Ok(marshal_values(values))
    }

    pub fn unmarshal(&self, bytes: &[u8]) -> Result<ValueDict, DatabaseError> {
        let values = unmarshal_values(&self.column_types, bytes)?;
        Ok(self
            .schema
            .column_names()
            .into_iter()
            .zip(values)
            .collect())
    }

    fn append(&mut self, bytes: &[u8]) -> Result<Handle, DatabaseError> {
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(DatabaseError::NoRoom {
                block_id: self.file.last_block_id(),
                needed: bytes.len(),
                available: MAX_RECORD_SIZE,
            });
        }

        let mut block = self.file.get(self.file.last_block_id())?;
        let record_id = match block.add(bytes) {
            Ok(record_id) => record_id,
            Err(DatabaseError::NoRoom { .. }) => {
                block = self.file.get_new()?;
                debug!(
                    table = %self.schema.table_name,
                    block_id = block.block_id(),
                    "last block full, appending to a new block"
                );
                block.add(bytes)?
            }
            Err(err) => return Err(err),
        };
        self.file.put(&block)?;
        Ok(Handle::new(block.block_id(), record_id))
    }

    fn record<'p>(page: &'p SlottedPage, handle: Handle) -> Result<&'p [u8], DatabaseError> {
        page.get(handle.record_id)
            .ok_or(DatabaseError::InvalidRecordId {
                block_id: handle.block_id,
                record_id: handle.record_id,
            })
    }

    fn matches(row: &ValueDict, where_clause: &ValueDict) -> bool {
        where_clause
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }
}

impl DbRelation for HeapTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn create(&mut self) -> Result<(), DatabaseError> {
        self.file.create()?;
        debug!(table = %self.schema.table_name, "created table");
        Ok(())
    }

    fn create_if_not_exists(&mut self) -> Result<(), DatabaseError> {
        if self.file.exists() {
            self.open()
        } else {
            self.create()
        }
    }

    fn destroy(&mut self) -> Result<(), DatabaseError> {
        self.file.destroy()
    }

    fn open(&mut self) -> Result<(), DatabaseError> {
        self.file.open()
    }

    fn close(&mut self) {
        self.file.close();
    }

    fn insert(&mut self, row: &ValueDict) -> Result<Handle, DatabaseError> {
        self.file.ensure_open()?;
        let bytes = self.marshal(row)?;
        self.append(&bytes)
    }

    fn update(&mut self, handle: Handle, new_values: &ValueDict) -> Result<(), DatabaseError> {
        for column in new_values.keys() {
            self.schema.require_column(column)?;
        }

        let mut block = self.file.get(handle.block_id)?;
        let mut row = self.unmarshal(Self::record(&block, handle)?)?;
        row.extend(new_values.iter().map(|(k, v)| (k.clone(), v.clone())));

        let bytes = self.marshal(&row)?;
        block.put(handle.record_id, &bytes)?;
        self.file.put(&block)
    }

    fn del(&mut self, handle: Handle) -> Result<(), DatabaseError> {
        let mut block = self.file.get(handle.block_id)?;
        block.del(handle.record_id)?;
        self.file.put(&block)
    }

    fn select(&self, where_clause: Option<&ValueDict>) -> Result<Vec<Handle>, DatabaseError> {
        self.file.ensure_open()?;
        if let Some(where_clause) = where_clause {
            for column in where_clause.keys() {
                self.schema.require_column(column)?;
            }
        }

        let mut handles = Vec::new();
        for block_id in self.file.block_ids() {
            let block = self.file.get(block_id)?;
            for record_id in block.ids() {
                let handle = Handle::new(block_id, record_id);
                if let Some(where_clause) = where_clause {
                    let row = self.unmarshal(Self::record(&block, handle)?)?;
                    if !Self::matches(&row, where_clause) {
                        continue;
                    }
                }
                handles.push(handle);
            }
        }
        Ok(handles)
    }

    fn project(&self, handle: Handle) -> Result<ValueDict, DatabaseError> {
        let block = self.file.get(handle.block_id)?;
        self.unmarshal(Self::record(&block, handle)?)
    }

    fn project_columns(
        &self,
        handle: Handle,
        columns: &[String],
    ) -> Result<ValueDict, DatabaseError> {
        for column in columns {
            self.schema.require_column(column)?;
        }
        let mut row = self.project(handle)?;
        row.retain(|column, _| columns.contains(column));
        Ok(row)
    }
}
