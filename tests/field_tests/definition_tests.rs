//! Tests for Definition and key identity
//!
//! These tests verify:
//! - Structural value matching with embedded literals and decodable columns
//! - First-match dispatch in registration order
//! - Deterministic, order-sensitive table ids
//! - The key registry

use std::sync::Arc;

use fieldstore::definition::{decode_record, dispatch};
use fieldstore::key::{table_id, KeyRegistry, NS_KEY};
use fieldstore::{Column, Definition, Entry, Field, FieldKind, FieldSize, Value};
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

struct Doc {
    id: Field,
    kind: Field,
    title: Field,
    size: Field,
}

impl Doc {
    fn new() -> Self {
        Self {
            id: Field::new(Uuid::new_v4(), "doc.id", FieldKind::Int32),
            kind: Field::new(Uuid::new_v4(), "doc.kind", FieldKind::Int32),
            title: Field::new(Uuid::new_v4(), "doc.title", FieldKind::Text(FieldSize::NullTerminated)),
            size: Field::new(Uuid::new_v4(), "doc.size", FieldKind::Int64),
        }
    }

    fn text(&self) -> Definition {
        Definition::named(
            "text",
            vec![Column::from(&self.id)],
            vec![Column::from(self.kind.value(1)), Column::from(&self.title)],
        )
    }

    fn binary(&self) -> Definition {
        Definition::named(
            "binary",
            vec![Column::from(&self.id)],
            vec![Column::from(self.kind.value(2)), Column::from(&self.size)],
        )
    }
}

// =============================================================================
// Value Matching Tests
// =============================================================================

#[test]
fn test_matches_value_with_equal_literal() {
    let doc = Doc::new();
    assert!(doc.text().matches_value(b"\0\0\0\x01Title"));
}

#[test]
fn test_matches_value_rejects_other_literal() {
    let doc = Doc::new();
    assert!(!doc.text().matches_value(b"\0\0\0\x02Title"));
}

#[test]
fn test_matches_value_requires_exact_consumption() {
    let doc = Doc::new();
    let binary = doc.binary();

    assert!(binary.matches_value(&[0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 9]));
    assert!(!binary.matches_value(&[0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 9, 1]));
    assert!(!binary.matches_value(&[0, 0, 0, 2, 0, 0, 0]));
}

#[test]
fn test_empty_value_layout_matches_only_empty_bytes() {
    let doc = Doc::new();
    let bare = Definition::new(vec![Column::from(&doc.id)], vec![]);

    assert!(bare.matches_value(&[]));
    assert!(!bare.matches_value(&[1]));
}

#[test]
fn test_matches_value_requires_decodable_columns() {
    let id = Field::new(Uuid::new_v4(), "note.id", FieldKind::Int32);
    let text = Field::new(Uuid::new_v4(), "note.text", FieldKind::Text(FieldSize::Prefixed1));
    let raw = Field::new(Uuid::new_v4(), "note.raw", FieldKind::Bytes(FieldSize::Prefixed1));
    let as_text = Definition::new(vec![Column::from(&id)], vec![Column::from(&text)]);
    let as_bytes = Definition::new(vec![Column::from(&id)], vec![Column::from(&raw)]);

    assert!(!as_text.matches_value(&[0xFF, 0xFE]));
    assert!(as_bytes.matches_value(&[0xFF, 0xFE]));
    assert!(as_text.matches_value(b"note"));
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_dispatch_picks_matching_shape() {
    let doc = Doc::new();
    let definitions = vec![Arc::new(doc.text()), Arc::new(doc.binary())];

    let (index, definition) = dispatch(&[0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 9], &definitions).unwrap();

    assert_eq!(index, 1);
    assert_eq!(definition.name(), Some("binary"));
}

#[test]
fn test_dispatch_first_match_wins() {
    let doc = Doc::new();
    let loose = Definition::named("loose", vec![Column::from(&doc.id)], vec![Column::from(&doc.title)]);
    let definitions = vec![Arc::new(loose), Arc::new(doc.text())];

    // Both layouts accept these bytes; registration order decides
    let (index, _) = dispatch(b"\0\0\0\x01Title", &definitions).unwrap();
    assert_eq!(index, 0);
}

#[test]
fn test_dispatch_skips_layout_that_cannot_decode() {
    let id = Field::new(Uuid::new_v4(), "note.id", FieldKind::Int32);
    let text = Field::new(Uuid::new_v4(), "note.text", FieldKind::Text(FieldSize::Prefixed1));
    let raw = Field::new(Uuid::new_v4(), "note.raw", FieldKind::Bytes(FieldSize::Prefixed1));
    let definitions = vec![
        Arc::new(Definition::named("text", vec![Column::from(&id)], vec![Column::from(&text)])),
        Arc::new(Definition::named("raw", vec![Column::from(&id)], vec![Column::from(&raw)])),
    ];

    let (index, definition) = dispatch(&[0xFF, 0xFE], &definitions).unwrap();
    assert_eq!(index, 1);
    assert_eq!(definition.name(), Some("raw"));

    let entry = decode_record(&[0, 0, 0, 1], &[0xFF, 0xFE], &definitions).unwrap();
    assert_eq!(entry.get(&raw), Some(&Value::Bytes(vec![0xFF, 0xFE])));
}

#[test]
fn test_decode_record_without_match_keeps_key_fields() {
    let doc = Doc::new();
    let definitions = vec![Arc::new(doc.text()), Arc::new(doc.binary())];

    let entry = decode_record(&[0, 0, 0, 3], &[0xAB], &definitions).unwrap();

    assert_eq!(entry.len(), 1);
    assert_eq!(entry.get(&doc.id), Some(&Value::Int32(3)));
}

#[test]
fn test_decode_record_merges_key_and_value() {
    let doc = Doc::new();
    let definitions = vec![Arc::new(doc.text()), Arc::new(doc.binary())];

    let entry = decode_record(&[0, 0, 0, 3], b"\0\0\0\x01Hello", &definitions).unwrap();

    assert_eq!(
        entry,
        Entry::new(&[doc.id.value(3), doc.kind.value(1), doc.title.value("Hello")])
    );
}

// =============================================================================
// Key Identity Tests
// =============================================================================

#[test]
fn test_table_id_is_name_based_uuid_of_field_uuids() {
    let a = Field::new(Uuid::new_v4(), "a", FieldKind::Int32);
    let b = Field::new(Uuid::new_v4(), "b", FieldKind::Int32);

    let mut name = a.uuid().as_bytes().to_vec();
    name.extend_from_slice(b.uuid().as_bytes());
    let expected = Uuid::new_v5(&NS_KEY, &name);

    let id = table_id(&[Column::from(&a), Column::from(&b)]);
    assert_eq!(*id.as_uuid(), expected);
}

#[test]
fn test_table_id_depends_on_order() {
    let a = Field::new(Uuid::new_v4(), "a", FieldKind::Int32);
    let b = Field::new(Uuid::new_v4(), "b", FieldKind::Int32);

    assert_ne!(
        table_id(&[Column::from(&a), Column::from(&b)]),
        table_id(&[Column::from(&b), Column::from(&a)])
    );
}

#[test]
fn test_table_id_ignores_literals_and_identity() {
    let uuid = Uuid::new_v4();
    let a = Field::new(uuid, "a", FieldKind::Int32);
    let twin = Field::new(uuid, "a", FieldKind::Int32);

    assert_eq!(
        table_id(&[Column::from(&a)]),
        table_id(&[Column::from(twin.value(5))])
    );
}

#[test]
fn test_definitions_sharing_key_share_table() {
    let doc = Doc::new();
    assert_eq!(doc.text().table_id(), doc.binary().table_id());
}

#[test]
fn test_registry_resolves_registered_and_unknown_layouts() {
    let doc = Doc::new();
    let mut registry = KeyRegistry::new();
    let columns = vec![Column::from(&doc.id)];

    let registered = registry.register(&columns);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.resolve(&columns), registered);

    let unknown = vec![Column::from(&doc.kind)];
    assert_eq!(registry.resolve(&unknown), table_id(&unknown));
    assert_eq!(registry.len(), 1);
}
