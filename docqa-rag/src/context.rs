//! Prompt context formatting for retrieved evidence.

use crate::document::SearchResult;

/// Separator placed after every chunk block.
pub const BLOCK_DELIMITER: &str = "---";

/// Render ranked evidence as numbered, delimited blocks for the generator.
///
/// Each block carries the chunk number (from 1), file name, page (`N/A` when
/// unknown), the section when present, the relevance score with three
/// decimals, and the full chunk text. Blocks appear in input order.
///
/// ```text
/// [Chunk 1]
/// Source: report.pdf
/// Page: 3
/// Section: Results
/// Relevance Score: 0.912
///
/// Content:
/// Revenue grew 12% year over year.
///
/// ---
/// ```
pub fn format_context(results: &[SearchResult]) -> String {
    let blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let chunk = &result.chunk;
            let page = chunk.page.map_or_else(|| "N/A".to_string(), |p| p.to_string());
            let section = chunk
                .section
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| format!("Section: {s}\n"))
                .unwrap_or_default();
            format!(
                "[Chunk {}]\nSource: {}\nPage: {page}\n{section}Relevance Score: {:.3}\n\n\
                 Content:\n{}\n\n{BLOCK_DELIMITER}",
                i + 1,
                chunk.source_filename,
                result.score,
                chunk.text,
            )
        })
        .collect();

    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    #[test]
    fn formats_numbered_blocks_with_metadata() {
        let results = vec![
            SearchResult {
                chunk: Chunk::new("Revenue grew 12%.", "report.pdf", "d1")
                    .with_page(3)
                    .with_section("Results"),
                score: 0.91234,
            },
            SearchResult { chunk: Chunk::new("Plain notes.", "notes.txt", "d2"), score: 0.5 },
        ];

        let expected = "[Chunk 1]\nSource: report.pdf\nPage: 3\nSection: Results\n\
                        Relevance Score: 0.912\n\nContent:\nRevenue grew 12%.\n\n---\n\n\
                        [Chunk 2]\nSource: notes.txt\nPage: N/A\nRelevance Score: 0.500\n\n\
                        Content:\nPlain notes.\n\n---";
        assert_eq!(format_context(&results), expected);
    }

    #[test]
    fn formatting_is_deterministic_and_order_preserving() {
        let results = vec![
            SearchResult { chunk: Chunk::new("low", "a.txt", "d"), score: 0.1 },
            SearchResult { chunk: Chunk::new("high", "b.txt", "d"), score: 0.9 },
        ];
        let first = format_context(&results);
        assert_eq!(first, format_context(&results));
        assert!(first.find("low").unwrap() < first.find("high").unwrap());
    }

    #[test]
    fn empty_evidence_formats_to_empty_string() {
        assert_eq!(format_context(&[]), "");
    }
}
