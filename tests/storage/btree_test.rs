use bambang_heap::{
    storage::{
        btree::{BTreeIndex, key::MAX_KEY_SIZE},
        index::DbIndex,
        relation::{DbRelation, HeapTable},
    },
    types::{
        error::DatabaseError,
        value::{DataType, Value, value_dict},
    },
    utils::mock::TempEnv,
};

fn foo_table(env: &TempEnv) -> Result<HeapTable, DatabaseError> {
    let mut table = HeapTable::new(
        env.env(),
        "foo",
        vec![
            ("a".to_string(), DataType::Int),
            ("b".to_string(), DataType::Int),
        ],
    )?;
    table.create()?;
    Ok(table)
}

#[test]
fn test_lookup_after_bulk_load() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = foo_table(&env)?;
    table.insert(&value_dict([("a", 12), ("b", 99)]))?;
    table.insert(&value_dict([("a", 88), ("b", 101)]))?;
    for i in 0..1000 {
        table.insert(&value_dict([("a", i + 100), ("b", -i)]))?;
    }

    let mut index = BTreeIndex::new(env.env(), &table, "fooindex", vec!["a".to_string()], true)?;
    index.create(&table)?;
    assert!(index.is_open());
    assert!(index.height().unwrap_or(0) >= 2);
    assert_eq!(env.files(), vec!["foo-fooindex.db".to_string(), "foo.db".to_string()]);

    let found = index.lookup(&value_dict([("a", 12)]))?;
    assert_eq!(found.len(), 1);
    assert_eq!(table.project(found[0])?, value_dict([("a", 12), ("b", 99)]));

    let found = index.lookup(&value_dict([("a", 88)]))?;
    assert_eq!(table.project(found[0])?, value_dict([("a", 88), ("b", 101)]));

    assert!(index.lookup(&value_dict([("a", 6)]))?.is_empty());

    for j in 0..1000 {
        let found = index.lookup(&value_dict([("a", j + 100)]))?;
        assert_eq!(found.len(), 1, "key {}", j + 100);
        assert_eq!(table.project(found[0])?["b"], Value::Int(-j));
    }
    Ok(())
}

#[test]
fn test_incremental_inserts_and_reopen() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = foo_table(&env)?;
    let mut index = BTreeIndex::new(env.env(), &table, "fooindex", vec!["a".to_string()], true)?;
    index.create(&table)?;
    assert_eq!(index.height(), Some(1));

    // Descending keys exercise splits at the left edge.
    for a in (0..1500).rev() {
        let handle = table.insert(&value_dict([("a", a), ("b", a * 2)]))?;
        index.insert(&table, handle)?;
    }
    let height = index.height();
    index.close();
    assert!(!index.is_open());
    assert!(matches!(
        index.lookup(&value_dict([("a", 1)])),
        Err(DatabaseError::FileClosed { .. })
    ));

    let mut index = BTreeIndex::new(env.env(), &table, "fooindex", vec!["a".to_string()], true)?;
    index.open()?;
    assert_eq!(index.height(), height);
    for a in [0, 1, 749, 750, 1499] {
        let found = index.lookup(&value_dict([("a", a)]))?;
        assert_eq!(found.len(), 1);
        assert_eq!(table.project(found[0])?["b"], Value::Int(a * 2));
    }
    assert!(index.lookup(&value_dict([("a", 1500)]))?.is_empty());
    Ok(())
}

#[test]
fn test_duplicate_key_is_rejected() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = foo_table(&env)?;
    table.insert(&value_dict([("a", 1), ("b", 1)]))?;
    let mut index = BTreeIndex::new(env.env(), &table, "uniq", vec!["a".to_string()], true)?;
    index.create(&table)?;

    let dup = table.insert(&value_dict([("a", 1), ("b", 2)]))?;
    let err = index.insert(&table, dup).unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateKey { ref index, .. } if index == "uniq"));
    assert_eq!(index.lookup(&value_dict([("a", 1)]))?.len(), 1);
    Ok(())
}

#[test]
fn test_failed_create_removes_index_file() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = foo_table(&env)?;
    table.insert(&value_dict([("a", 5), ("b", 1)]))?;
    table.insert(&value_dict([("a", 5), ("b", 2)]))?;

    let mut index = BTreeIndex::new(env.env(), &table, "broken", vec!["a".to_string()], true)?;
    let err = index.create(&table).unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateKey { .. }));
    assert!(!index.is_open());
    assert_eq!(env.files(), vec!["foo.db".to_string()]);
    Ok(())
}

#[test]
fn test_composite_text_keys_grow_tall_tree() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = HeapTable::new(
        env.env(),
        "names",
        vec![
            ("last".to_string(), DataType::Text),
            ("first".to_string(), DataType::Text),
            ("id".to_string(), DataType::Int),
        ],
    )?;
    table.create()?;
    let mut index = BTreeIndex::new(
        env.env(),
        &table,
        "by_name",
        vec!["last".to_string(), "first".to_string()],
        true,
    )?;
    index.create(&table)?;

    // Wide keys leave only a handful of entries per node.
    let pad = "z".repeat(400);
    for id in 0..400 {
        let last = format!("{:04}{}", id % 50, pad);
        let first = format!("{:04}", id);
        let handle = table.insert(&value_dict([
            ("last", Value::from(last)),
            ("first", Value::from(first)),
            ("id", Value::Int(id)),
        ]))?;
        index.insert(&table, handle)?;
    }
    assert!(index.height().unwrap_or(0) >= 3);

    for id in [0, 57, 199, 399] {
        let key = value_dict([
            ("last", Value::from(format!("{:04}{}", id % 50, pad))),
            ("first", Value::from(format!("{:04}", id))),
        ]);
        let found = index.lookup(&key)?;
        assert_eq!(found.len(), 1);
        assert_eq!(table.project(found[0])?["id"], Value::Int(id));
    }
    Ok(())
}

#[test]
fn test_key_validation() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let table = foo_table(&env)?;
    let mut index = BTreeIndex::new(env.env(), &table, "fooindex", vec!["a".to_string()], true)?;
    index.create(&table)?;

    assert!(matches!(
        index.lookup(&value_dict([("b", 1)])),
        Err(DatabaseError::Validation { .. })
    ));
    assert!(matches!(
        index.lookup(&value_dict([("a", "1")])),
        Err(DatabaseError::Validation { .. })
    ));
    assert_eq!(index.tkey(&value_dict([("a", 3), ("b", 4)]))?, vec![Value::Int(3)]);
    assert_eq!(index.key_columns(), &["a".to_string()]);
    Ok(())
}

#[test]
fn test_oversized_key_is_rejected() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = HeapTable::new(env.env(), "wide", vec![("k".to_string(), DataType::Text)])?;
    table.create()?;
    let mut index = BTreeIndex::new(env.env(), &table, "k_index", vec!["k".to_string()], true)?;
    index.create(&table)?;

    let handle = table.insert(&value_dict([("k", "w".repeat(MAX_KEY_SIZE))]))?;
    match index.insert(&table, handle) {
        Err(DatabaseError::NoRoom { needed, available, .. }) => {
            assert_eq!(needed, MAX_KEY_SIZE + 2);
            assert_eq!(available, MAX_KEY_SIZE);
        }
        other => panic!("expected NoRoom, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_lookup_with_oversized_key_finds_nothing() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = HeapTable::new(env.env(), "wide", vec![("k".to_string(), DataType::Text)])?;
    table.create()?;
    table.insert(&value_dict([("k", "short")]))?;
    let mut index = BTreeIndex::new(env.env(), &table, "k_index", vec!["k".to_string()], true)?;
    index.create(&table)?;

    assert!(index.lookup(&value_dict([("k", "w".repeat(MAX_KEY_SIZE))]))?.is_empty());
    assert_eq!(index.lookup(&value_dict([("k", "short")]))?.len(), 1);
    Ok(())
}

#[test]
fn test_create_over_oversized_row_fails_and_cleans_up() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = HeapTable::new(env.env(), "wide", vec![("k".to_string(), DataType::Text)])?;
    table.create()?;
    table.insert(&value_dict([("k", "a")]))?;
    table.insert(&value_dict([("k", "w".repeat(2000))]))?;

    let mut index = BTreeIndex::new(env.env(), &table, "k_index", vec!["k".to_string()], true)?;
    assert!(matches!(index.create(&table), Err(DatabaseError::NoRoom { .. })));
    assert!(!index.is_open());
    assert_eq!(env.files(), vec!["wide.db".to_string()]);
    Ok(())
}

#[test]
fn test_range_and_delete_are_not_supported() -> Result<(), DatabaseError> {
    let env = TempEnv::new();
    let mut table = foo_table(&env)?;
    let handle = table.insert(&value_dict([("a", 1), ("b", 1)]))?;
    let mut index = BTreeIndex::new(env.env(), &table, "fooindex", vec!["a".to_string()], true)?;
    index.create(&table)?;

    assert!(matches!(index.range(None, None), Err(DatabaseError::NotSupported { .. })));
    assert!(matches!(index.del(handle), Err(DatabaseError::NotSupported { .. })));

    index.destroy()?;
    assert_eq!(env.files(), vec!["foo.db".to_string()]);
    Ok(())
}
