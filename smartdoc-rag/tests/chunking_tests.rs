//! Word-window chunking behaviour and properties.

mod common;

use common::numbered_words;
use proptest::prelude::*;
use smartdoc_rag::{Chunker, Document, RagError, WordWindowChunker, chunk_text};

#[test]
fn long_document_splits_into_overlapping_windows() {
    let text = numbered_words(1400);
    let chunker = WordWindowChunker::new(600, 50).unwrap();
    let chunks = chunker.chunk(&Document::new("report", text));

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].words, 0..600);
    assert_eq!(chunks[1].words, 550..1150);
    assert_eq!(chunks[2].words, 1100..1400);
    assert!(chunks[1].text.starts_with("w550 "));
    assert!(chunks[2].text.ends_with(" w1399"));
    assert_eq!(chunks[2].text.split_whitespace().count(), 300);
}

#[test]
fn short_document_is_a_single_trimmed_chunk() {
    let chunks = chunk_text("   The quick brown fox jumps.  \n", 600, 50).unwrap();
    assert_eq!(chunks, vec!["The quick brown fox jumps.".to_string()]);
}

#[test]
fn blank_text_yields_no_chunks() {
    assert!(chunk_text("", 600, 50).unwrap().is_empty());
    assert!(chunk_text(" \n\t ", 600, 50).unwrap().is_empty());
}

#[test]
fn windows_below_minimum_length_are_discarded() {
    let chunker = WordWindowChunker::new(600, 50).unwrap();
    assert!(chunker.split("ok").is_empty());

    let chunker = chunker.with_min_chunk_chars(0);
    assert_eq!(chunker.split("ok").len(), 1);
}

#[test]
fn chunks_carry_ids_offsets_and_metadata() {
    let text = "Ünïcode wörds are split on whitespace only, not on bytes.";
    let document = Document::new("doc-7", text).with_metadata("page", "3");
    let chunker = WordWindowChunker::new(4, 1).unwrap();
    let chunks = chunker.chunk(&document);

    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.id, format!("doc-7_{i}"));
        assert_eq!(chunk.index, i);
        assert_eq!(chunk.document_id, "doc-7");
        assert_eq!(&text[chunk.bytes.clone()], chunk.text);
        assert_eq!(chunk.metadata.get("page").map(String::as_str), Some("3"));
        assert_eq!(chunk.metadata.get("chunk_index"), Some(&i.to_string()));
    }
    assert_eq!(chunks[0].text, "Ünïcode wörds are split");
    assert_eq!(chunks[1].text, "split on whitespace only,");
}

#[test]
fn invalid_parameters_are_rejected_before_any_work() {
    assert!(matches!(WordWindowChunker::new(0, 0), Err(RagError::Configuration(_))));
    assert!(matches!(WordWindowChunker::new(2001, 0), Err(RagError::Configuration(_))));
    assert!(matches!(chunk_text("some text here", 100, 100), Err(RagError::Configuration(_))));
    assert!(WordWindowChunker::new(2000, 1999).is_ok());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn overlap_not_smaller_than_size_is_a_configuration_error(
        size in 1usize..200,
        extra in 0usize..50,
    ) {
        let result = WordWindowChunker::new(size, size + extra);
        prop_assert!(matches!(result, Err(RagError::Configuration(_))));
    }

    #[test]
    fn dropping_overlaps_reconstructs_the_word_sequence(
        words in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 0..300),
        size in 1usize..60,
        overlap_seed in 0usize..60,
    ) {
        let overlap = overlap_seed % size;
        let text = words.join(" ");
        let chunker = WordWindowChunker::new(size, overlap).unwrap().with_min_chunk_chars(0);
        let windows = chunker.split(&text);

        let mut rebuilt: Vec<String> = Vec::new();
        for (i, window) in windows.iter().enumerate() {
            let window_words: Vec<&str> = window.text.split_whitespace().collect();
            prop_assert!(window_words.len() <= size);
            prop_assert_eq!(window_words.len(), window.words.len());
            let skip = if i == 0 { 0 } else { overlap };
            rebuilt.extend(window_words.into_iter().skip(skip).map(str::to_string));
        }
        prop_assert_eq!(rebuilt, words);
    }

    #[test]
    fn consecutive_windows_share_exactly_the_overlap(
        word_count in 1usize..500,
        size in 2usize..80,
        overlap_seed in 0usize..80,
    ) {
        let overlap = overlap_seed % size;
        let chunker = WordWindowChunker::new(size, overlap).unwrap().with_min_chunk_chars(0);
        let windows = chunker.split(&numbered_words(word_count));

        prop_assert_eq!(windows.first().map(|w| w.words.start), Some(0));
        prop_assert_eq!(windows.last().map(|w| w.words.end), Some(word_count));
        for pair in windows.windows(2) {
            prop_assert_eq!(pair[0].words.end - pair[1].words.start, overlap);
        }
    }
}
