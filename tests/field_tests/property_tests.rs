//! Property tests for the record codec and byte ordering

use std::cmp::Ordering;

use fieldstore::comparator::{compare, prefix_successor};
use fieldstore::{Column, Entry, Field, FieldKind, FieldSize};
use proptest::prelude::*;
use uuid::Uuid;

struct Layout {
    id: Field,
    label: Field,
    tag: Field,
    seq: Field,
    note: Field,
}

impl Layout {
    fn new() -> Self {
        Self {
            id: Field::new(Uuid::new_v4(), "id", FieldKind::Int32),
            label: Field::new(Uuid::new_v4(), "label", FieldKind::Text(FieldSize::Prefixed2)),
            tag: Field::new(Uuid::new_v4(), "tag", FieldKind::Bytes(FieldSize::NullTerminated)),
            seq: Field::new(Uuid::new_v4(), "seq", FieldKind::Int64),
            note: Field::new(Uuid::new_v4(), "note", FieldKind::Text(FieldSize::NullTerminated)),
        }
    }

    fn columns(&self) -> Vec<Column> {
        [&self.id, &self.label, &self.tag, &self.seq, &self.note]
            .into_iter()
            .map(Column::from)
            .collect()
    }
}

proptest! {
    #[test]
    fn decode_inverts_encode(
        id in any::<i32>(),
        label in "\\PC{0,40}",
        tag in prop::collection::vec(1u8..=255, 0..32),
        seq in any::<i64>(),
        note in "\\PC{0,40}",
    ) {
        let layout = Layout::new();
        let columns = layout.columns();
        let entry = Entry::new(&[
            layout.id.value(id),
            layout.label.value(label),
            layout.tag.value(tag),
            layout.seq.value(seq),
            layout.note.value(note),
        ]);

        let bytes = entry.to_bytes(&columns).unwrap();
        prop_assert_eq!(Entry::decode(&bytes, &columns).unwrap(), entry);
    }

    #[test]
    fn comparator_matches_slice_order(
        a in prop::collection::vec(any::<u8>(), 0..16),
        b in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        prop_assert_eq!(compare(&a, &b), a.cmp(&b));
        prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
    }

    #[test]
    fn proper_prefix_sorts_first(
        a in prop::collection::vec(any::<u8>(), 0..16),
        suffix in prop::collection::vec(any::<u8>(), 1..8),
    ) {
        let mut longer = a.clone();
        longer.extend_from_slice(&suffix);
        prop_assert_eq!(compare(&a, &longer), Ordering::Less);
    }

    #[test]
    fn prefix_successor_bounds_every_extension(
        prefix in prop::collection::vec(any::<u8>(), 1..8),
        suffix in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        if let Some(successor) = prefix_successor(&prefix) {
            let mut extended = prefix.clone();
            extended.extend_from_slice(&suffix);
            prop_assert_eq!(compare(&extended, &successor), Ordering::Less);
            prop_assert_eq!(compare(&prefix, &successor), Ordering::Less);
        }
    }

    #[test]
    fn upper_bound_separates_neighbouring_keys(
        id in 0..i32::MAX,
        seq in any::<i32>(),
        next_seq in any::<i32>(),
    ) {
        let id_field = Field::new(Uuid::new_v4(), "id", FieldKind::Int32);
        let seq_field = Field::new(Uuid::new_v4(), "seq", FieldKind::Int32);
        let columns = vec![Column::from(&id_field), Column::from(&seq_field)];

        let bound = Entry::new(&[id_field.value(id)])
            .upper_bound(&columns)
            .unwrap()
            .unwrap();
        let inside = Entry::new(&[id_field.value(id), seq_field.value(seq)])
            .to_bytes(&columns)
            .unwrap();
        let after = Entry::new(&[id_field.value(id + 1), seq_field.value(next_seq)])
            .to_bytes(&columns)
            .unwrap();

        prop_assert_eq!(compare(&inside, &bound), Ordering::Less);
        prop_assert_eq!(compare(&bound, &after), Ordering::Less);
    }

    #[test]
    fn truncated_upper_bound_covers_variable_tails(
        id in 0..i32::MAX,
        name in "\\PC{0,20}",
    ) {
        let id_field = Field::new(Uuid::new_v4(), "id", FieldKind::Int32);
        let name_field = Field::new(Uuid::new_v4(), "name", FieldKind::Text(FieldSize::NullTerminated));
        let columns = vec![Column::from(&id_field), Column::from(&name_field)];

        let bound = Entry::new(&[id_field.value(id)])
            .upper_bound(&columns)
            .unwrap()
            .unwrap();
        let inside = Entry::new(&[id_field.value(id), name_field.value(name)])
            .to_bytes(&columns)
            .unwrap();

        prop_assert_eq!(compare(&inside, &bound), Ordering::Less);
        prop_assert!(compare(&(id + 1).to_be_bytes(), &bound) != Ordering::Less);
    }
}
