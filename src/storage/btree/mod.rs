pub mod key;
pub mod node;
pub mod stat;

use tracing::debug;

use crate::{
    storage::{
        btree::{
            key::{KeyProfile, KeyValue, MAX_KEY_SIZE, format_key},
            node::{InteriorNode, LeafNode, Node, SplitResult},
            stat::BTreeStat,
        },
        env::DbEnv,
        heap_file::HeapFile,
        index::DbIndex,
        relation::DbRelation,
    },
    types::{BlockId, error::DatabaseError, handle::Handle, value::ValueDict},
    utils::compensation::Compensation,
};

/// Unique B-tree over one or more key columns of a relation. Leaves map keys
/// to row handles; every node is one block of the index's own file.
#[derive(Debug)]
pub struct BTreeIndex {
    name: String,
    key_profile: KeyProfile,
    file: HeapFile,
    stat: Option<BTreeStat>,
    root: Option<Node>,
}

impl BTreeIndex {
    pub fn new(
        env: &DbEnv,
        relation: &dyn DbRelation,
        name: impl Into<String>,
        key_columns: Vec<String>,
        unique: bool,
    ) -> Result<Self, DatabaseError> {
        let name = name.into();
        if !unique {
            return Err(DatabaseError::relation(format!(
                "index '{}': only unique B-tree indices are supported",
                name
            )));
        }
        let key_profile = KeyProfile::build(relation, &key_columns)?;
        let file = HeapFile::new(env, format!("{}-{}", relation.table_name(), name));
        Ok(Self {
            name,
            key_profile,
            file,
            stat: None,
            root: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_columns(&self) -> &[String] {
        self.key_profile.columns()
    }

    pub fn is_open(&self) -> bool {
        self.root.is_some()
    }

    /// Levels in the tree; 1 while the root is still a leaf.
    pub fn height(&self) -> Option<u32> {
        self.stat.map(|stat| stat.height)
    }

    pub fn root_block_id(&self) -> Option<BlockId> {
        self.stat.map(|stat| stat.root_id)
    }

    /// Key values of `key_dict` in key-column order.
    pub fn tkey(&self, key_dict: &ValueDict) -> Result<KeyValue, DatabaseError> {
        self.key_profile.extract(key_dict)
    }

    fn opened(&self) -> Result<(&Node, BTreeStat), DatabaseError> {
        match (&self.root, self.stat) {
            (Some(root), Some(stat)) => Ok((root, stat)),
            _ => Err(DatabaseError::FileClosed {
                name: self.file.name().to_string(),
            }),
        }
    }

    fn lookup_in(&self, node: &Node, height: u32, key: &KeyValue) -> Result<Vec<Handle>, DatabaseError> {
        match node {
            Node::Leaf(leaf) => Ok(leaf.find(key).into_iter().collect()),
            Node::Interior(interior) => {
                let child = Node::load(
                    &self.file,
                    interior.find_child(key),
                    height - 1 == 1,
                    &self.key_profile,
                )?;
                self.lookup_in(&child, height - 1, key)
            }
        }
    }

    /// Insert below `node`, saving every node it touches. Returns the split
    /// the caller has to absorb when `node` overflowed.
    fn insert_recursive(
        file: &mut HeapFile,
        profile: &KeyProfile,
        index_name: &str,
        node: &mut Node,
        height: u32,
        key: &KeyValue,
        handle: Handle,
    ) -> Result<Option<SplitResult>, DatabaseError> {
        match node {
            Node::Leaf(leaf) => {
                if !leaf.insert(key.clone(), handle) {
                    return Err(DatabaseError::DuplicateKey {
                        index: index_name.to_string(),
                        key: format_key(key),
                    });
                }
                if !leaf.overflows() {
                    leaf.save(file, profile)?;
                    return Ok(None);
                }

                let sibling = leaf.split(file)?;
                let boundary = sibling
                    .first_key()
                    .cloned()
                    .ok_or_else(|| DatabaseError::relation("leaf split produced an empty sibling"))?;
                sibling.save(file, profile)?;
                leaf.save(file, profile)?;
                debug!(index = index_name, block_id = leaf.block_id, sibling = sibling.block_id, "split leaf");
                Ok(Some(SplitResult {
                    sibling: sibling.block_id,
                    boundary,
                }))
            }
            Node::Interior(interior) => {
                let mut child = Node::load(file, interior.find_child(key), height - 1 == 1, profile)?;
                let Some(child_split) =
                    Self::insert_recursive(file, profile, index_name, &mut child, height - 1, key, handle)?
                else {
                    return Ok(None);
                };

                interior.insert(child_split.boundary, child_split.sibling);
                if !interior.overflows() {
                    interior.save(file, profile)?;
                    return Ok(None);
                }

                let (sibling, boundary) = interior.split(file)?;
                sibling.save(file, profile)?;
                interior.save(file, profile)?;
                debug!(
                    index = index_name,
                    block_id = interior.block_id,
                    sibling = sibling.block_id,
                    "split interior node"
                );
                Ok(Some(SplitResult {
                    sibling: sibling.block_id,
                    boundary,
                }))
            }
        }
    }
}

impl DbIndex for BTreeIndex {
    fn create(&mut self, relation: &dyn DbRelation) -> Result<(), DatabaseError> {
        Compensation::run(self, |index, undo| {
            index.file.create()?;
            undo.on_failure("remove index file", |index: &mut BTreeIndex| {
                index.stat = None;
                index.root = None;
                index.file.destroy()
            });

            let root = Node::Leaf(LeafNode::new(index.file.get_new()?.block_id()));
            root.save(&mut index.file, &index.key_profile)?;
            let stat = BTreeStat::new(root.block_id(), 1);
            stat.save(&mut index.file)?;
            index.stat = Some(stat);
            index.root = Some(root);

            let handles = relation.select(None)?;
            for handle in &handles {
                index.insert(relation, *handle)?;
            }
            debug!(index = %index.name, rows = handles.len(), "created index");
            Ok(())
        })
    }

    fn destroy(&mut self) -> Result<(), DatabaseError> {
        self.close();
        self.file.destroy()
    }

    fn open(&mut self) -> Result<(), DatabaseError> {
        if self.is_open() {
            return Ok(());
        }
        self.file.open()?;
        let stat = BTreeStat::load(&self.file)?;
        let root = Node::load(&self.file, stat.root_id, stat.height == 1, &self.key_profile)?;
        self.stat = Some(stat);
        self.root = Some(root);
        Ok(())
    }

    fn close(&mut self) {
        self.file.close();
        self.stat = None;
        self.root = None;
    }

    fn lookup(&self, key_dict: &ValueDict) -> Result<Vec<Handle>, DatabaseError> {
        let key = self.tkey(key_dict)?;
        let (root, stat) = self.opened()?;
        if KeyProfile::encoded_size(&key) > MAX_KEY_SIZE {
            // Never stored, so never found.
            return Ok(Vec::new());
        }
        self.lookup_in(root, stat.height, &key)
    }

    fn range(
        &self,
        _min_key: Option<&ValueDict>,
        _max_key: Option<&ValueDict>,
    ) -> Result<Vec<Handle>, DatabaseError> {
        Err(DatabaseError::not_supported("B-tree range query"))
    }

    fn insert(&mut self, relation: &dyn DbRelation, handle: Handle) -> Result<(), DatabaseError> {
        let row = relation.project_columns(handle, self.key_profile.columns())?;
        let key = self.tkey(&row)?;

        let (Some(root), Some(stat)) = (self.root.as_mut(), self.stat.as_mut()) else {
            return Err(DatabaseError::FileClosed {
                name: self.file.name().to_string(),
            });
        };
        self.key_profile.check_size(&key, stat.root_id)?;
        let split = Self::insert_recursive(
            &mut self.file,
            &self.key_profile,
            &self.name,
            root,
            stat.height,
            &key,
            handle,
        )?;

        if let Some(split) = split {
            let block_id = self.file.get_new()?.block_id();
            let new_root = Node::Interior(InteriorNode::new(
                block_id,
                root.block_id(),
                vec![(split.boundary, split.sibling)],
            ));
            new_root.save(&mut self.file, &self.key_profile)?;
            stat.root_id = block_id;
            stat.height += 1;
            stat.save(&mut self.file)?;
            *root = new_root;
            debug!(index = %self.name, height = stat.height, root = block_id, "grew new root");
        }
        Ok(())
    }

    fn del(&mut self, _handle: Handle) -> Result<(), DatabaseError> {
        Err(DatabaseError::not_supported("B-tree delete"))
    }
}
