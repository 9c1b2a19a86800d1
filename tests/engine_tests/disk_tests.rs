//! Tests for DiskEngine
//!
//! These tests verify:
//! - Writes and deletes survive a reopen
//! - Every fanned-out operation reaches its table's log
//! - A torn log tail is truncated on open without losing earlier records

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use fieldstore::log::LogRecovery;
use fieldstore::{
    Column, Config, Definition, DiskEngine, Field, FieldKind, FieldSize, StorageEngine,
    SyncStrategy, Value,
};
use tempfile::TempDir;
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

struct Schema {
    person: Field,
    name: Field,
    company: Field,
}

impl Schema {
    fn new() -> Self {
        Self {
            person: Field::new(Uuid::new_v4(), "person.id", FieldKind::Int32),
            name: Field::new(Uuid::new_v4(), "person.name", FieldKind::Text(FieldSize::NullTerminated)),
            company: Field::new(Uuid::new_v4(), "company.id", FieldKind::Int32),
        }
    }

    fn definitions(&self) -> Vec<Definition> {
        vec![
            Definition::new(vec![self.person.clone().into()], vec![self.name.clone().into()]),
            Definition::new(
                vec![self.company.clone().into(), self.person.clone().into()],
                vec![],
            ),
        ]
    }

    fn open(&self, dir: &TempDir) -> DiskEngine {
        let config = Config::builder()
            .data_dir(dir.path())
            .sync_strategy(SyncStrategy::EveryWrite)
            .build();
        DiskEngine::open(config, self.definitions()).unwrap()
    }

    fn person_log(&self, engine: &DiskEngine) -> PathBuf {
        let table = engine.engine().table_id(&[Column::from(&self.person)]);
        engine.provider().log_path(&table)
    }

    fn name_of(&self, engine: &DiskEngine, id: i32) -> Option<String> {
        engine
            .get(&[self.person.value(id)])
            .unwrap()
            .and_then(|e| e.get(&self.name).and_then(Value::as_str).map(str::to_string))
    }
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_open_creates_table_logs() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::new();
    let engine = schema.open(&dir);

    assert!(schema.person_log(&engine).exists());
    assert_eq!(engine.engine().table_count(), 2);
}

#[test]
fn test_puts_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::new();
    {
        let engine = schema.open(&dir);
        for id in 1..=10 {
            engine
                .put(&[schema.person.value(id), schema.name.value(format!("p{}", id))])
                .unwrap();
        }
        engine.sync().unwrap();
    }

    let engine = schema.open(&dir);
    assert_eq!(schema.name_of(&engine, 7).as_deref(), Some("p7"));

    let count = engine
        .iterate(None, None, &[Column::from(&schema.person)])
        .unwrap()
        .unwrap()
        .count();
    assert_eq!(count, 10);
}

#[test]
fn test_overwrite_and_remove_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::new();
    {
        let engine = schema.open(&dir);
        engine.put(&[schema.person.value(1), schema.name.value("old")]).unwrap();
        engine.put(&[schema.person.value(1), schema.name.value("new")]).unwrap();
        engine.put(&[schema.person.value(2), schema.name.value("gone")]).unwrap();
        engine.remove(&[schema.person.value(2)]).unwrap();
    }

    let engine = schema.open(&dir);
    assert_eq!(schema.name_of(&engine, 1).as_deref(), Some("new"));
    assert_eq!(schema.name_of(&engine, 2), None);
}

#[test]
fn test_fan_out_is_logged_per_table() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::new();
    let engine = schema.open(&dir);

    let applied = engine
        .put(&[
            schema.company.value(3),
            schema.person.value(1),
            schema.name.value("Ada"),
        ])
        .unwrap();
    assert_eq!(applied.len(), 2);

    for op in &applied {
        let path = engine.provider().log_path(&op.table);
        assert_eq!(LogRecovery::verify(&path).unwrap().entries_recovered, 1);
    }
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_torn_tail_is_truncated_on_open() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::new();
    let path = {
        let engine = schema.open(&dir);
        engine.put(&[schema.person.value(1), schema.name.value("Ada")]).unwrap();
        engine.put(&[schema.person.value(2), schema.name.value("Bob")]).unwrap();
        schema.person_log(&engine)
    };

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0xFF; 9]).unwrap();
    drop(file);

    {
        let engine = schema.open(&dir);
        assert_eq!(schema.name_of(&engine, 1).as_deref(), Some("Ada"));
        assert_eq!(schema.name_of(&engine, 2).as_deref(), Some("Bob"));
        engine.put(&[schema.person.value(3), schema.name.value("Cy")]).unwrap();
    }

    let result = LogRecovery::verify(&path).unwrap();
    assert_eq!(result.entries_recovered, 3);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 3);
}
