//! Terminal rendering of answers and statistics.

use smartdoc_rag::{Answer, IndexStats, IngestReport};

/// Longest excerpt shown per source passage.
const EXCERPT_CHARS: usize = 160;

pub fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.text);

    let retrieval = &answer.retrieval;
    if !retrieval.has_relevant_content() {
        println!("(no passage met the similarity threshold)");
        return;
    }
    println!("Sources:");
    for hit in retrieval.used_hits() {
        let chunk = &hit.chunk;
        println!(
            "  [{:.2}] {} #{}: {}",
            hit.score,
            chunk.document_id,
            chunk.index,
            excerpt(&chunk.text)
        );
    }
}

pub fn print_stats(stats: &IndexStats) {
    println!("Documents:  {}", stats.document_count);
    println!("Chunks:     {}", stats.chunk_count);
    println!("Embedder:   {} ({} dimensions)", stats.embedder, stats.dimensions);
    if stats.chunk_count > 0 {
        println!(
            "Chunk size: {:.0} chars on average ({} to {})",
            stats.avg_chunk_chars, stats.min_chunk_chars, stats.max_chunk_chars
        );
    }
}

pub fn print_ingest(report: &IngestReport) {
    println!(
        "Indexed {} chunk(s) from {} document(s) in {:.1}s; index now holds {} chunk(s).",
        report.chunks,
        report.documents,
        report.elapsed.as_secs_f64(),
        report.total_chunks
    );
    for id in &report.skipped {
        println!("  skipped {id}: no text long enough to index");
    }
}

/// First line of `text`, cut to [`EXCERPT_CHARS`] characters.
pub fn excerpt(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().trim();
    if line.chars().count() <= EXCERPT_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(EXCERPT_CHARS).collect();
    format!("{}…", cut.trim_end())
}
