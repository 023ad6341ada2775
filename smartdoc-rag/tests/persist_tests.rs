//! Persisting and reloading the in-memory index.

mod common;

use std::fs;

use common::chunk;
use smartdoc_rag::inmemory::InMemoryIndex;
use smartdoc_rag::persist::{CHUNKS_FILE, VECTORS_FILE};
use smartdoc_rag::{RagError, VectorIndex};
use tempfile::tempdir;

fn sample_index() -> InMemoryIndex {
    let chunks = vec![
        chunk("handbook", 0, "Vacation requests go to your manager."),
        chunk("handbook", 1, "Remote work requires a signed agreement."),
        chunk("faq", 0, "Parking passes are renewed every January."),
    ];
    let vectors = vec![
        vec![0.3, -1.2, 0.5, 0.0],
        vec![1.0, 1.0, 0.0, 0.25],
        vec![-0.7, 0.1, 0.9, 2.0],
    ];
    InMemoryIndex::from_parts(chunks, vectors, 4, "test-embedder").unwrap()
}

fn single_chunk_index() -> InMemoryIndex {
    let chunks = vec![chunk("x", 0, "only chunk")];
    InMemoryIndex::from_parts(chunks, vec![vec![1.0; 4]], 4, "test-embedder").unwrap()
}

#[test]
fn round_trip_preserves_search_results() {
    let dir = tempdir().unwrap();
    let index = sample_index();
    index.persist(dir.path()).unwrap();

    let loaded = InMemoryIndex::load(dir.path()).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.dimensions(), 4);
    assert_eq!(loaded.embedder(), "test-embedder");
    assert_eq!(loaded.chunks(), index.chunks());

    for query in [[1.0, 0.0, 0.0, 0.0], [0.2, -0.4, 0.9, 0.1], [0.0, 0.0, 0.0, 1.0]] {
        assert_eq!(loaded.search(&query, 3).unwrap(), index.search(&query, 3).unwrap());
    }
}

#[test]
fn persisting_twice_overwrites_cleanly() {
    let dir = tempdir().unwrap();
    sample_index().persist(dir.path()).unwrap();

    let smaller = single_chunk_index();
    smaller.persist(dir.path()).unwrap();

    let loaded = InMemoryIndex::load(dir.path()).unwrap();
    assert_eq!(loaded.len(), 1);
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn empty_index_round_trips() {
    let dir = tempdir().unwrap();
    InMemoryIndex::empty(8, "test-embedder").persist(dir.path()).unwrap();
    let loaded = InMemoryIndex::load(dir.path()).unwrap();
    assert!(loaded.is_empty());
    assert_eq!(loaded.dimensions(), 8);
}

#[test]
fn missing_artifacts_are_a_load_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(InMemoryIndex::load(dir.path()), Err(RagError::IndexLoad { .. })));

    sample_index().persist(dir.path()).unwrap();
    fs::remove_file(dir.path().join(CHUNKS_FILE)).unwrap();
    match InMemoryIndex::load(dir.path()) {
        Err(RagError::IndexLoad { path, .. }) => assert!(path.ends_with(CHUNKS_FILE)),
        other => panic!("expected IndexLoad, got {other:?}"),
    }
}

#[test]
fn corrupt_vector_blob_is_a_load_error() {
    let dir = tempdir().unwrap();
    sample_index().persist(dir.path()).unwrap();
    let vectors_path = dir.path().join(VECTORS_FILE);

    let mut blob = fs::read(&vectors_path).unwrap();
    blob[0] = b'X';
    fs::write(&vectors_path, &blob).unwrap();
    assert!(matches!(InMemoryIndex::load(dir.path()), Err(RagError::IndexLoad { .. })));

    blob[0] = b'S';
    blob.truncate(blob.len() - 3);
    fs::write(&vectors_path, &blob).unwrap();
    assert!(matches!(InMemoryIndex::load(dir.path()), Err(RagError::IndexLoad { .. })));
}

#[test]
fn corrupt_metadata_is_a_load_error() {
    let dir = tempdir().unwrap();
    sample_index().persist(dir.path()).unwrap();
    fs::write(dir.path().join(CHUNKS_FILE), b"{ not json").unwrap();
    assert!(matches!(InMemoryIndex::load(dir.path()), Err(RagError::IndexLoad { .. })));
}

#[test]
fn artifacts_from_different_builds_are_rejected() {
    let dir = tempdir().unwrap();
    let other = tempdir().unwrap();
    sample_index().persist(dir.path()).unwrap();

    let smaller = single_chunk_index();
    smaller.persist(other.path()).unwrap();
    fs::copy(other.path().join(CHUNKS_FILE), dir.path().join(CHUNKS_FILE)).unwrap();

    match InMemoryIndex::load(dir.path()) {
        Err(RagError::IndexLoad { message, .. }) => assert!(message.contains("1 chunks")),
        other => panic!("expected IndexLoad, got {other:?}"),
    }
}

#[test]
fn same_shaped_artifacts_from_different_builds_are_rejected() {
    let dir = tempdir().unwrap();
    let newer = tempdir().unwrap();
    let two_chunks = |alpha: &str, beta: &str, vectors: Vec<Vec<f32>>| {
        InMemoryIndex::from_parts(
            vec![chunk("notes", 0, alpha), chunk("notes", 1, beta)],
            vectors,
            2,
            "test-embedder",
        )
        .unwrap()
    };

    two_chunks("old alpha text", "old beta text", vec![vec![0.0, 1.0], vec![1.0, 0.0]])
        .persist(dir.path())
        .unwrap();
    two_chunks("new alpha text", "new beta text", vec![vec![1.0, 0.0], vec![0.0, 1.0]])
        .persist(newer.path())
        .unwrap();

    // Interrupted rewrite: the vectors were replaced, the metadata was not.
    fs::copy(newer.path().join(VECTORS_FILE), dir.path().join(VECTORS_FILE)).unwrap();

    match InMemoryIndex::load(dir.path()) {
        Err(RagError::IndexLoad { message, .. }) => assert!(message.contains("different builds")),
        other => panic!("expected IndexLoad, got {other:?}"),
    }
}

#[test]
fn repersisting_the_same_index_still_loads() {
    let dir = tempdir().unwrap();
    let index = sample_index();
    index.persist(dir.path()).unwrap();
    index.persist(dir.path()).unwrap();
    assert_eq!(InMemoryIndex::load(dir.path()).unwrap().chunks(), index.chunks());
}
