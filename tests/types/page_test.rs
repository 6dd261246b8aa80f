use std::collections::BTreeMap;

use bambang_heap::types::{
    BLOCK_SZ, MAX_RECORD_SIZE, RecordId, SLOT_HEADER_SIZE, error::DatabaseError, page::SlottedPage,
};
use proptest::prelude::*;

fn create_test_data(size: usize, seed: u8) -> Vec<u8> {
    (0..size).map(|i| (i as u8).wrapping_add(seed)).collect()
}

#[test]
fn test_new_page_is_empty() {
    let page = SlottedPage::new(7);
    assert_eq!(page.block_id(), 7);
    assert_eq!(page.num_records(), 0);
    assert_eq!(page.end_free() as usize, BLOCK_SZ - 1);
    assert_eq!(page.free_space(), BLOCK_SZ - SLOT_HEADER_SIZE);
    assert_eq!(page.live_bytes(), 0);
    assert!(page.ids().is_empty());
    assert_eq!(page.as_bytes().len(), BLOCK_SZ);
}

#[test]
fn test_add_put_del_keeps_neighbours_intact() -> Result<(), DatabaseError> {
    let mut page = SlottedPage::new(1);
    let first = page.add(b"hello")?;
    let second = page.add(b"wow!")?;
    let third = page.add(b"goodbye")?;
    assert_eq!((first, second, third), (1, 2, 3));

    // Grow the middle record: everything stored before it slides left.
    page.put(second, b"wowzers, that is long")?;
    assert_eq!(page.get(first), Some(&b"hello"[..]));
    assert_eq!(page.get(second), Some(&b"wowzers, that is long"[..]));
    assert_eq!(page.get(third), Some(&b"goodbye"[..]));

    // Shrink it again.
    page.put(second, b"w")?;
    assert_eq!(page.get(first), Some(&b"hello"[..]));
    assert_eq!(page.get(second), Some(&b"w"[..]));
    assert_eq!(page.get(third), Some(&b"goodbye"[..]));
    assert_eq!(page.live_bytes(), 5 + 1 + 7);

    page.del(first)?;
    assert_eq!(page.get(first), None);
    assert_eq!(page.get(third), Some(&b"goodbye"[..]));
    assert_eq!(page.ids(), vec![second, third]);
    assert_eq!(page.live_bytes(), 1 + 7);
    Ok(())
}

#[test]
fn test_record_ids_are_not_reused() -> Result<(), DatabaseError> {
    let mut page = SlottedPage::new(1);
    page.add(b"a")?;
    let b = page.add(b"b")?;
    page.del(b)?;
    assert_eq!(page.add(b"c")?, 3);
    assert_eq!(page.num_records(), 3);
    assert!(matches!(page.del(b), Err(DatabaseError::InvalidRecordId { .. })));
    assert!(matches!(page.put(0, b"x"), Err(DatabaseError::InvalidRecordId { .. })));
    Ok(())
}

#[test]
fn test_exact_fit_then_full() -> Result<(), DatabaseError> {
    let mut page = SlottedPage::new(1);
    assert!(page.has_room(MAX_RECORD_SIZE));
    assert!(!page.has_room(MAX_RECORD_SIZE + 1));
    let before = page.clone();
    assert!(matches!(
        page.add(&create_test_data(MAX_RECORD_SIZE + 1, 0)),
        Err(DatabaseError::NoRoom { .. })
    ));
    assert_eq!(page, before);

    let id = page.add(&create_test_data(MAX_RECORD_SIZE, 3))?;
    assert_eq!(page.free_space(), 0);
    assert!(!page.has_room(0));
    assert_eq!(page.get(id), Some(&create_test_data(MAX_RECORD_SIZE, 3)[..]));

    let full = page.clone();
    assert!(matches!(page.add(&[]), Err(DatabaseError::NoRoom { .. })));
    assert_eq!(page, full);
    assert_eq!(page.num_records(), 1);
    Ok(())
}

#[test]
fn test_delete_then_re_add_compacts_to_same_usage() -> Result<(), DatabaseError> {
    let records = [
        create_test_data(700, 1),
        create_test_data(45, 2),
        create_test_data(1200, 3),
    ];
    let mut control = SlottedPage::new(1);
    let mut page = SlottedPage::new(1);
    for bytes in &records {
        control.add(bytes)?;
        page.add(bytes)?;
    }

    page.del(2)?;
    assert_eq!(page.live_bytes(), control.live_bytes() - records[1].len());
    let readded = page.add(&records[1])?;
    assert_eq!(readded, 4);

    assert_eq!(page.live_bytes(), control.live_bytes());
    assert_eq!(page.end_free(), control.end_free());
    assert_eq!(page.free_space() + SLOT_HEADER_SIZE, control.free_space());

    let live: Vec<&[u8]> = page.ids().into_iter().filter_map(|id| page.get(id)).collect();
    let expected: Vec<&[u8]> = [1, 3, 2]
        .into_iter()
        .filter_map(|id| control.get(id))
        .collect();
    assert_eq!(live, expected);
    Ok(())
}

#[test]
fn test_put_without_room_leaves_page_unchanged() -> Result<(), DatabaseError> {
    let mut page = SlottedPage::new(1);
    let big = page.add(&create_test_data(3000, 1))?;
    let small = page.add(&create_test_data(10, 2))?;
    let before = page.clone();

    let err = page.put(small, &create_test_data(2000, 9)).unwrap_err();
    assert!(matches!(err, DatabaseError::NoRoom { .. }));
    assert_eq!(page, before);
    assert_eq!(page.get(big).map(<[u8]>::len), Some(3000));
    Ok(())
}

#[test]
fn test_put_with_same_size_is_a_plain_overwrite() -> Result<(), DatabaseError> {
    let mut page = SlottedPage::new(1);
    page.add(b"left")?;
    let id = page.add(b"1234")?;
    let end_free = page.end_free();
    page.put(id, b"abcd")?;
    assert_eq!(page.end_free(), end_free);
    assert_eq!(page.get(id), Some(&b"abcd"[..]));
    Ok(())
}

#[test]
fn test_from_bytes_round_trip_and_rejects_garbage() -> Result<(), DatabaseError> {
    let mut page = SlottedPage::new(4);
    page.add(b"persist me")?;
    let copy = SlottedPage::from_bytes(4, page.as_bytes())?;
    assert_eq!(copy, page);

    let mut bytes = page.as_bytes().to_vec();
    // end_free pointing past the block
    bytes[2..4].copy_from_slice(&(BLOCK_SZ as u16).to_le_bytes());
    assert!(matches!(
        SlottedPage::from_bytes(4, &bytes),
        Err(DatabaseError::CorruptedBlock { block_id: 4, .. })
    ));
    assert!(SlottedPage::from_bytes(4, &bytes[..100]).is_err());
    Ok(())
}

#[derive(Clone, Debug)]
enum PageOp {
    Add(Vec<u8>),
    Put(usize, Vec<u8>),
    Del(usize),
}

fn op_strategy() -> impl Strategy<Value = PageOp> {
    let bytes = prop::collection::vec(any::<u8>(), 0..300);
    prop_oneof![
        3 => bytes.clone().prop_map(PageOp::Add),
        2 => (any::<usize>(), bytes).prop_map(|(i, b)| PageOp::Put(i, b)),
        1 => any::<usize>().prop_map(PageOp::Del),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Any mix of operations leaves the record area packed: live bytes equal
    // the sum of live record sizes and every record reads back unchanged.
    #[test]
    fn prop_page_matches_model(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut page = SlottedPage::new(1);
        let mut model: BTreeMap<RecordId, Vec<u8>> = BTreeMap::new();

        for op in ops {
            match op {
                PageOp::Add(bytes) => {
                    let fits = page.has_room(bytes.len());
                    let before = page.clone();
                    match page.add(&bytes) {
                        Ok(id) => {
                            prop_assert!(fits);
                            model.insert(id, bytes);
                        }
                        Err(DatabaseError::NoRoom { .. }) => {
                            prop_assert!(!fits);
                            prop_assert_eq!(&page, &before);
                        }
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                }
                PageOp::Put(pick, bytes) => {
                    if model.is_empty() {
                        continue;
                    }
                    let id = *model.keys().nth(pick % model.len()).unwrap();
                    let before = page.clone();
                    match page.put(id, &bytes) {
                        Ok(()) => {
                            model.insert(id, bytes);
                        }
                        Err(DatabaseError::NoRoom { .. }) => prop_assert_eq!(&page, &before),
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                }
                PageOp::Del(pick) => {
                    if model.is_empty() {
                        continue;
                    }
                    let id = *model.keys().nth(pick % model.len()).unwrap();
                    page.del(id).unwrap();
                    model.remove(&id);
                }
            }

            prop_assert_eq!(page.ids(), model.keys().copied().collect::<Vec<_>>());
            for (id, bytes) in &model {
                prop_assert_eq!(page.get(*id), Some(&bytes[..]));
            }
            let total: usize = model.values().map(Vec::len).sum();
            prop_assert_eq!(page.live_bytes(), total);
        }
    }

    // Writing the same bytes back into a record does not move anything.
    #[test]
    fn prop_put_same_bytes_is_idempotent(records in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..20)) {
        let mut page = SlottedPage::new(1);
        let ids: Vec<RecordId> = records.iter().map(|r| page.add(r).unwrap()).collect();
        let before = page.clone();
        for (id, bytes) in ids.iter().zip(&records) {
            page.put(*id, bytes).unwrap();
        }
        prop_assert_eq!(page, before);
    }
}
