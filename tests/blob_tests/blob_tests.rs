//! Tests for the blob store
//!
//! These tests verify:
//! - Stream and block digests
//! - Block placement across volumes and 16-byte alignment
//! - Compression, pass-through of pre-encoded input and transcoding
//! - Blob references stored as field values
//! - Error reporting for unknown encodings and missing blocks
//! - Concurrent reads

use std::io::{self, Read};
use std::sync::Arc;

use fieldstore::blob::{pack_address, Block, BlobStore, StreamDigest};
use fieldstore::{
    Blob, Config, Definition, Engine, Field, FieldKind, StorageEngine, StoreError,
    StreamEncoding, Value,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

fn small_store() -> BlobStore {
    let config = Config::builder()
        .volume_size(64)
        .stream_buffer_size(16)
        .build();
    BlobStore::new(&config)
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn stream_hash(data: &[u8]) -> Vec<u8> {
    let mut expected = vec![0x01];
    expected.extend_from_slice(&Sha256::digest(data));
    expected
}

fn block_hash(data: &[u8]) -> Vec<u8> {
    let mut expected = vec![0x02];
    expected.extend_from_slice(&Sha256::digest(data)[..16]);
    expected
}

fn write(store: &BlobStore, data: &[u8], from: StreamEncoding, to: StreamEncoding) -> Blob {
    store.write(&mut &data[..], from, to).unwrap()
}

fn decoded(store: &BlobStore, blob: &Blob) -> Vec<u8> {
    let mut out = Vec::new();
    store
        .read(blob)
        .unwrap()
        .decoded(blob.encoding())
        .unwrap()
        .read_to_end(&mut out)
        .unwrap();
    out
}

/// Yields `len` bytes of 0xAA, then fails
struct FailingReader {
    len: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.len == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "input closed"));
        }
        let n = self.len.min(buf.len());
        buf[..n].fill(0xAA);
        self.len -= n;
        Ok(n)
    }
}

fn write_failing(store: &BlobStore, len: usize) {
    let result = store.write(
        &mut FailingReader { len },
        StreamEncoding::Identity,
        StreamEncoding::Identity,
    );
    assert!(matches!(result, Err(StoreError::Io(_))));
}

// =============================================================================
// Identity Tests
// =============================================================================

#[test]
fn test_identity_round_trip_and_digests() {
    let store = BlobStore::new(&Config::default());
    let data = pattern(5000);

    let blob = write(&store, &data, StreamEncoding::Identity, StreamEncoding::Identity);

    assert_eq!(blob.size(), 5000);
    assert_eq!(blob.stored_size(), 5000);
    assert_eq!(blob.encoding(), StreamEncoding::Identity);
    assert_eq!(blob.hash(), Some(stream_hash(&data).as_slice()));
    assert_eq!(blob.blocks().len(), 1);
    assert_eq!(blob.blocks()[0].hash, Some(block_hash(&data)));

    assert_eq!(store.read(&blob).unwrap().to_vec(), data);
}

#[test]
fn test_stream_digest_matches_sha256() {
    assert_eq!(StreamDigest::of(b"abc"), stream_hash(b"abc"));
}

#[test]
fn test_empty_stream() {
    let store = small_store();
    let blob = write(&store, &[], StreamEncoding::Identity, StreamEncoding::Identity);

    assert!(blob.blocks().is_empty());
    assert_eq!(blob.size(), 0);
    assert_eq!(blob.hash(), Some(stream_hash(&[]).as_slice()));
    assert_eq!(store.read(&blob).unwrap().remaining(), 0);
}

// =============================================================================
// Placement Tests
// =============================================================================

#[test]
fn test_blocks_span_volumes() {
    let store = small_store();
    let data = pattern(200);

    let blob = write(&store, &data, StreamEncoding::Identity, StreamEncoding::Identity);

    let sizes: Vec<u32> = blob.blocks().iter().map(|b| b.size).collect();
    assert_eq!(sizes, vec![64, 64, 64, 8]);
    let addresses: Vec<u64> = blob.blocks().iter().map(|b| b.address).collect();
    let expected: Vec<u64> = (0..4).map(|v| pack_address(v, 0).unwrap()).collect();
    assert_eq!(addresses, expected);
    assert_eq!(store.volume_count(), 4);

    let mut offset = 0;
    for block in blob.blocks() {
        let end = offset + block.size as usize;
        assert_eq!(block.hash, Some(block_hash(&data[offset..end])));
        offset = end;
    }

    let views: Vec<_> = store.read(&blob).unwrap().collect();
    assert_eq!(views.len(), 4);
    assert_eq!(store.read(&blob).unwrap().to_vec(), data);
}

#[test]
fn test_next_block_is_aligned_after_partial_volume() {
    let store = small_store();
    write(&store, &pattern(200), StreamEncoding::Identity, StreamEncoding::Identity);

    let next = write(&store, &pattern(10), StreamEncoding::Identity, StreamEncoding::Identity);

    assert_eq!(next.blocks().len(), 1);
    assert_eq!(next.blocks()[0].address, pack_address(3, 16).unwrap());
    assert_eq!(store.volume_count(), 4);
}

#[test]
fn test_small_blobs_share_a_volume() {
    let store = small_store();
    let a = write(&store, b"first", StreamEncoding::Identity, StreamEncoding::Identity);
    let b = write(&store, b"second", StreamEncoding::Identity, StreamEncoding::Identity);

    assert_eq!(a.blocks()[0].address, pack_address(0, 0).unwrap());
    assert_eq!(b.blocks()[0].address, pack_address(0, 16).unwrap());
    assert_eq!(store.read(&a).unwrap().to_vec(), b"first".to_vec());
    assert_eq!(store.read(&b).unwrap().to_vec(), b"second".to_vec());
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_compress_on_write() {
    let store = BlobStore::new(&Config::default());
    let data = vec![b'a'; 20_000];

    let blob = write(&store, &data, StreamEncoding::Identity, StreamEncoding::Zstd);

    assert_eq!(blob.encoding(), StreamEncoding::Zstd);
    assert_eq!(blob.size(), 20_000);
    assert!(blob.stored_size() < 20_000);
    assert_eq!(blob.hash(), Some(stream_hash(&data).as_slice()));
    assert_eq!(decoded(&store, &blob), data);
}

#[test]
fn test_pre_encoded_input_is_stored_unchanged() {
    let store = BlobStore::new(&Config::default());
    let data = pattern(10_000);
    let compressed = zstd::encode_all(&data[..], 3).unwrap();

    let blob = write(&store, &compressed, StreamEncoding::Zstd, StreamEncoding::Zstd);

    assert_eq!(store.read(&blob).unwrap().to_vec(), compressed);
    assert_eq!(blob.size(), 10_000);
    assert_eq!(blob.hash(), Some(stream_hash(&data).as_slice()));
    assert_eq!(decoded(&store, &blob), data);
}

#[test]
fn test_transcode_to_identity() {
    let store = small_store();
    let data = pattern(300);
    let compressed = zstd::encode_all(&data[..], 3).unwrap();

    let blob = write(&store, &compressed, StreamEncoding::Zstd, StreamEncoding::Identity);

    assert_eq!(blob.encoding(), StreamEncoding::Identity);
    assert_eq!(blob.size(), 300);
    assert_eq!(blob.hash(), Some(stream_hash(&data).as_slice()));
    assert_eq!(store.read(&blob).unwrap().to_vec(), data);
}

#[test]
fn test_unknown_encoding_tag() {
    assert!(matches!(
        StreamEncoding::from_byte(7),
        Err(StoreError::UnknownEncoding(7))
    ));

    let mut reference = Vec::new();
    Blob::new(vec![], 0, None, StreamEncoding::Identity).encode_reference(&mut reference);
    reference[8] = 7;
    assert!(matches!(
        Blob::decode_reference(&reference),
        Err(StoreError::UnknownEncoding(7))
    ));
}

#[test]
fn test_missing_block_is_invalid() {
    let store = small_store();
    let stray = Blob::new(
        vec![Block {
            address: pack_address(9, 0).unwrap(),
            size: 4,
            hash: None,
        }],
        4,
        None,
        StreamEncoding::Identity,
    );

    assert!(matches!(store.read(&stray), Err(StoreError::InvalidBlock(_))));
}

#[test]
fn test_block_length_mismatch_is_invalid() {
    let store = small_store();
    let blob = write(&store, b"twelve bytes", StreamEncoding::Identity, StreamEncoding::Identity);
    let mut block = blob.blocks()[0].clone();
    block.size = 5;
    let wrong = Blob::new(vec![block], 5, None, StreamEncoding::Identity);

    assert!(matches!(store.read(&wrong), Err(StoreError::InvalidBlock(_))));
}

#[test]
fn test_failed_write_leaves_no_bytes_behind() {
    let config = Config::builder()
        .volume_size(1024)
        .stream_buffer_size(8)
        .build();
    let store = BlobStore::new(&config);
    write_failing(&store, 20);

    let blob = write(&store, b"hello", StreamEncoding::Identity, StreamEncoding::Identity);

    assert_eq!(blob.size(), 5);
    assert_eq!(blob.stored_size(), 5);
    assert_eq!(blob.blocks().len(), 1);
    assert_eq!(blob.blocks()[0].address, pack_address(0, 0).unwrap());
    assert_eq!(blob.blocks()[0].hash, Some(block_hash(b"hello")));
    assert_eq!(store.read(&blob).unwrap().to_vec(), b"hello".to_vec());
}

#[test]
fn test_failed_write_after_blob_keeps_alignment() {
    let store = small_store();
    let first = write(&store, b"first", StreamEncoding::Identity, StreamEncoding::Identity);
    write_failing(&store, 20);

    let second = write(&store, b"second", StreamEncoding::Identity, StreamEncoding::Identity);

    assert_eq!(second.blocks()[0].address, pack_address(0, 16).unwrap());
    assert_eq!(store.read(&first).unwrap().to_vec(), b"first".to_vec());
    assert_eq!(store.read(&second).unwrap().to_vec(), b"second".to_vec());
}

#[test]
fn test_failed_write_across_volumes() {
    let store = small_store();
    // Fills volume 0, then fails part way into volume 1
    write_failing(&store, 100);
    assert_eq!(store.volume_count(), 2);

    let blob = write(&store, b"hello", StreamEncoding::Identity, StreamEncoding::Identity);

    assert_eq!(blob.blocks()[0].address, pack_address(1, 0).unwrap());
    assert_eq!(decoded(&store, &blob), b"hello".to_vec());
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_to_vec_after_partial_read() {
    let store = small_store();
    let data = pattern(100);
    let blob = write(&store, &data, StreamEncoding::Identity, StreamEncoding::Identity);

    let mut reader = store.read(&blob).unwrap();
    let mut head = [0u8; 70];
    reader.read_exact(&mut head).unwrap();

    assert_eq!(&head[..], &data[..70]);
    assert_eq!(reader.remaining(), 30);
    assert_eq!(reader.to_vec(), data[70..].to_vec());
}

// =============================================================================
// Field Integration Tests
// =============================================================================

#[test]
fn test_blob_as_field_value() {
    let id = Field::new(Uuid::new_v4(), "file.id", FieldKind::Int32);
    let content = Field::new(Uuid::new_v4(), "file.content", FieldKind::Blob);
    let engine = Engine::new(vec![Definition::new(
        vec![id.clone().into()],
        vec![content.clone().into()],
    )])
    .unwrap();

    let data = pattern(3000);
    let blob = engine
        .write(&mut &data[..], StreamEncoding::Identity, StreamEncoding::Zstd)
        .unwrap();
    engine.put(&[id.value(1), content.value(blob.clone())]).unwrap();

    let entry = engine.get(&[id.value(1)]).unwrap().unwrap();
    let stored = entry.get(&content).and_then(Value::as_blob).unwrap();
    assert_eq!(stored.blocks().len(), blob.blocks().len());
    assert_eq!(stored.size(), blob.size());
    assert_eq!(stored.encoding(), StreamEncoding::Zstd);
    assert_eq!(stored.hash(), None);

    let mut out = Vec::new();
    engine
        .read(stored)
        .unwrap()
        .decoded(stored.encoding())
        .unwrap()
        .read_to_end(&mut out)
        .unwrap();
    assert_eq!(out, data);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_reads() {
    let store = Arc::new(small_store());
    let blobs: Vec<(Vec<u8>, Blob)> = (1..=8)
        .map(|i| {
            let data = pattern(i * 37);
            let blob = write(&store, &data, StreamEncoding::Identity, StreamEncoding::Identity);
            (data, blob)
        })
        .collect();

    crossbeam::scope(|s| {
        for (data, blob) in &blobs {
            let store = store.clone();
            s.spawn(move |_| {
                for _ in 0..50 {
                    assert_eq!(store.read(blob).unwrap().to_vec(), *data);
                }
            });
        }
    })
    .unwrap();
}
