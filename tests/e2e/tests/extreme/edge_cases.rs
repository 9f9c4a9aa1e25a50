//! Extreme: unusual ids, box edges and batch misuse

use rfstore_core::{identify, BoundingBox, EmitterRecord, EmitterType, StoreError};
use rfstore_e2e_tests::{TestDataFactory, TestDatabaseManager};

fn at(id: &str, rf_type: EmitterType, latitude: f64, longitude: f64) -> EmitterRecord {
    let mut rec = EmitterRecord::new(identify(id, rf_type));
    rec.latitude = latitude;
    rec.longitude = longitude;
    rec
}

#[test]
fn test_quotes_in_ids() {
    let mut db = TestDatabaseManager::new_temp();
    let ids = ["it's", "\"quoted\"", "a'); DROP TABLE emitters; --", "back\\slash"];
    let records: Vec<_> = ids.iter().map(|id| at(id, EmitterType::Bt, 1.0, 1.0)).collect();
    db.insert_all(&records);

    for rec in &records {
        assert_eq!(db.store.get_emitter(&rec.id).unwrap().as_ref(), Some(rec));
    }
    let found = db.store.get_emitters(records.iter().map(|r| &r.id)).unwrap();
    assert_eq!(found.len(), ids.len());
    assert_eq!(db.count(), ids.len() as i64);
}

#[test]
fn test_wifi_id_containing_slash() {
    let mut db = TestDatabaseManager::new_temp();
    let rec = at("vendor/ap/7", EmitterType::Wlan5, 3.0, 3.0);
    db.insert_all(std::slice::from_ref(&rec));

    let hits = db
        .store
        .get_ids(EmitterType::Wlan5, &BoundingBox::new(4.0, 2.0, 4.0, 2.0))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits.contains(&rec.id));
    assert_eq!(hits.iter().next().unwrap().rf_id, "vendor/ap/7");
}

#[test]
fn test_same_raw_id_across_types() {
    let mut db = TestDatabaseManager::new_temp();
    let wifi = at("shared", EmitterType::Wlan2, 0.0, 0.0);
    let bt = at("shared", EmitterType::Bt, 0.0, 0.0);
    let wifi5 = at("shared", EmitterType::Wlan5, 0.0, 0.0);
    db.insert_all(&[wifi.clone(), bt.clone(), wifi5.clone()]);

    assert_eq!(db.count(), 3);
    assert_eq!(db.store.get_emitter(&wifi.id).unwrap(), Some(wifi));
    assert_eq!(db.store.get_emitter(&bt.id).unwrap(), Some(bt));
    assert_eq!(db.store.get_emitter(&wifi5.id).unwrap(), Some(wifi5));
}

#[test]
fn test_cell_raw_id_collision_is_constraint_violation() {
    // non-WiFi rows are keyed by raw id alone
    let mut db = TestDatabaseManager::new_temp();
    let mut batch = db.store.begin().unwrap();
    batch.insert(&at("310/260/1/2", EmitterType::Gsm, 0.0, 0.0)).unwrap();
    let err = batch
        .insert(&at("310/260/1/2", EmitterType::Lte, 0.0, 0.0))
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation { ref key } if key == "310/260/1/2"));
    batch.discard().unwrap();
}

#[test]
fn test_mutations_do_not_cross_types_on_shared_raw_id() {
    let mut db = TestDatabaseManager::new_temp();
    let gsm = at("310/260/1/2", EmitterType::Gsm, 0.0, 0.0);
    db.insert_all(std::slice::from_ref(&gsm));

    let mut lte = at("310/260/1/2", EmitterType::Lte, 9.0, 9.0);
    lte.trust = 99;
    let mut batch = db.store.begin().unwrap();
    assert_eq!(batch.update(&lte).unwrap(), 0);
    assert_eq!(batch.drop_emitter(&identify("310/260/1/2", EmitterType::Mobile)).unwrap(), 0);
    batch.end().unwrap();

    assert_eq!(db.store.get_emitter(&gsm.id).unwrap(), Some(gsm));
    assert_eq!(db.count(), 1);
}

#[test]
fn test_empty_raw_id() {
    let mut db = TestDatabaseManager::new_temp();
    let rec = at("", EmitterType::Wlan2, 0.0, 0.0);
    db.insert_all(std::slice::from_ref(&rec));
    assert_eq!(db.store.get_emitter(&rec.id).unwrap(), Some(rec));
}

#[test]
fn test_box_edges_are_inclusive() {
    let mut db = TestDatabaseManager::new_temp();
    let bb = BoundingBox::new(10.0, -10.0, 20.0, -20.0);
    db.insert_all(&[
        at("n", EmitterType::Lte, 10.0, 0.0),
        at("s", EmitterType::Lte, -10.0, 0.0),
        at("e", EmitterType::Lte, 0.0, 20.0),
        at("w", EmitterType::Lte, 0.0, -20.0),
        at("corner", EmitterType::Lte, 10.0, 20.0),
        at("out", EmitterType::Lte, 10.000001, 0.0),
    ]);

    let ids = db.store.get_ids(EmitterType::Lte, &bb).unwrap();
    assert_eq!(ids.len(), 5);
    assert!(!ids.contains(&identify("out", EmitterType::Lte)));
}

#[test]
fn test_degenerate_and_inverted_boxes() {
    let mut db = TestDatabaseManager::new_temp();
    db.insert_all(&[at("p", EmitterType::Nr, 1.0, 1.0)]);

    let point = BoundingBox::new(1.0, 1.0, 1.0, 1.0);
    assert_eq!(db.store.get_ids(EmitterType::Nr, &point).unwrap().len(), 1);

    let inverted = BoundingBox::new(0.0, 2.0, 2.0, 0.0);
    assert!(db.store.get_ids(EmitterType::Nr, &inverted).unwrap().is_empty());
}

#[test]
fn test_empty_type_list_matches_nothing() {
    let mut db = TestDatabaseManager::new_temp();
    db.seed_wifi(5);
    let world = BoundingBox::new(90.0, -90.0, 180.0, -180.0);
    assert!(db.store.get_emitters_in_box(&[], &world).unwrap().is_empty());
}

#[test]
fn test_repeated_types_do_not_duplicate_rows() {
    let mut db = TestDatabaseManager::new_temp();
    db.seed_wifi(4);
    let world = BoundingBox::new(90.0, -90.0, 180.0, -180.0);
    let rows = db
        .store
        .get_emitters_in_box(&[EmitterType::Wlan2, EmitterType::Wlan2], &world)
        .unwrap();
    assert_eq!(rows.len(), 4);
}

#[test]
fn test_bulk_lookup_across_chunks() {
    let mut db = TestDatabaseManager::new_temp();
    let stored = db.seed_wifi(1100);
    let found = db.store.get_emitters(&stored).unwrap();
    assert_eq!(found.len(), 1100);
}

#[test]
fn test_empty_batch_leaves_file_identical() {
    let mut db = TestDatabaseManager::new_temp();
    db.seed_wifi(10);
    let before = db.file_bytes();

    let batch = db.store.begin().unwrap();
    assert!(!batch.end().unwrap());

    let after = db.file_bytes();
    assert_eq!(before, after);
}

#[test]
fn test_missing_updates_and_drops_still_commit() {
    let mut db = TestDatabaseManager::new_temp();
    let mut batch = db.store.begin().unwrap();
    assert_eq!(batch.update(&TestDataFactory::wifi("00:00:00:00:00:00", EmitterType::Wlan2, 0.0, 0.0)).unwrap(), 0);
    assert_eq!(batch.drop_emitter(&identify("ghost", EmitterType::Bt)).unwrap(), 0);
    assert!(batch.updates_made());
    assert!(batch.end().unwrap());
    assert_eq!(db.count(), 0);
}

#[test]
fn test_leaked_batch_blocks_next_begin() {
    let mut db = TestDatabaseManager::new_temp();
    let batch = db.store.begin().unwrap();
    std::mem::forget(batch);

    let err = db.store.begin().err().unwrap();
    assert!(matches!(err, StoreError::TransactionMisuse(_)));

    // a fresh connection recovers
    db.reopen();
    assert!(db.store.begin().is_ok());
}
