//! Citation marker extraction and evidence cross-referencing.
//!
//! Generated answers cite their sources inline with markers of the form
//!
//! ```text
//! [Source: <filename>[, Page: <digits>][, Section: <text-without-closing-bracket>]]
//! ```
//!
//! Parsing is purely syntactic and tolerant: anything that does not match the
//! grammar, or matches with an empty file name, is skipped.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::document::{Chunk, Citation};

static CITATION_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\[Source:\s*([^,\]]+)(?:,\s*Page:\s*(\d+))?(?:,\s*Section:\s*([^\]]+))?\]").ok()
});

/// Marker fields as written in the answer, before evidence lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationMarker {
    pub source: String,
    pub page: Option<u32>,
    pub section: Option<String>,
}

/// Parse every well-formed citation marker in `text`, in order of appearance.
pub fn parse_markers(text: &str) -> Vec<CitationMarker> {
    let Some(pattern) = CITATION_PATTERN.as_ref() else {
        return Vec::new();
    };

    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let source = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            if source.is_empty() {
                warn!(marker = &caps[0], "skipping citation marker without a source name");
                return None;
            }
            let page = match caps.get(2) {
                Some(digits) => match digits.as_str().parse::<u32>() {
                    Ok(page) => Some(page),
                    Err(_) => {
                        warn!(marker = &caps[0], "skipping citation marker with unusable page");
                        return None;
                    }
                },
                None => None,
            };
            let section = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            Some(CitationMarker { source: source.to_string(), page, section })
        })
        .collect()
}

/// Preview of a chunk's text: at most `max_chars` characters, with `...`
/// appended when the text was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Extract citations from `answer` and attach excerpts from `evidence`.
///
/// A marker matches the first evidence chunk with the same file name and, if
/// the marker names a page, the same page. Unmatched markers still produce a
/// [`Citation`], with an empty excerpt.
pub fn extract_citations(answer: &str, evidence: &[Chunk], excerpt_chars: usize) -> Vec<Citation> {
    parse_markers(answer)
        .into_iter()
        .map(|marker| {
            let excerpt = evidence
                .iter()
                .find(|chunk| {
                    chunk.source_filename == marker.source
                        && marker.page.is_none_or(|page| chunk.page == Some(page))
                })
                .map(|chunk| excerpt(&chunk.text, excerpt_chars))
                .unwrap_or_default();
            Citation { source: marker.source, page: marker.page, section: marker.section, excerpt }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo_evidence() -> Vec<Chunk> {
        vec![
            Chunk::new("Rivers of France.", "geo.pdf", "g").with_page(1),
            Chunk::new("Paris is the capital and largest city of France.", "geo.pdf", "g")
                .with_page(3),
        ]
    }

    #[test]
    fn extracts_marker_with_page_and_matches_evidence() {
        let citations =
            extract_citations("Paris is the capital. [Source: geo.pdf, Page: 3]", &geo_evidence(), 200);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].source, "geo.pdf");
        assert_eq!(citations[0].page, Some(3));
        assert_eq!(citations[0].section, None);
        assert_eq!(citations[0].excerpt, "Paris is the capital and largest city of France.");
    }

    #[test]
    fn marker_without_page_matches_first_chunk_of_file() {
        let citations = extract_citations("See [Source: geo.pdf].", &geo_evidence(), 200);
        assert_eq!(citations[0].excerpt, "Rivers of France.");
    }

    #[test]
    fn parses_section_and_preserves_order() {
        let answer = "A [Source: b.pdf, Section: Intro, part 2] then \
                      B [Source: a.pdf, Page: 7, Section: Methods ] and C [Source: c.txt]";
        let markers = parse_markers(answer);
        assert_eq!(
            markers,
            vec![
                CitationMarker {
                    source: "b.pdf".into(),
                    page: None,
                    section: Some("Intro, part 2".into())
                },
                CitationMarker {
                    source: "a.pdf".into(),
                    page: Some(7),
                    section: Some("Methods".into())
                },
                CitationMarker { source: "c.txt".into(), page: None, section: None },
            ]
        );
    }

    #[test]
    fn unmatched_citation_keeps_empty_excerpt() {
        let citations = extract_citations("[Source: geo.pdf, Page: 9]", &geo_evidence(), 200);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].page, Some(9));
        assert!(citations[0].excerpt.is_empty());

        let citations = extract_citations("[Source: other.pdf]", &geo_evidence(), 200);
        assert!(citations[0].excerpt.is_empty());
    }

    #[test]
    fn malformed_markers_are_skipped() {
        assert!(extract_citations("See [Source: ]", &geo_evidence(), 200).is_empty());
        assert!(parse_markers("[Source geo.pdf] [source: geo.pdf] [Source: geo.pdf").is_empty());
        assert!(parse_markers("[Source: a.pdf, Page: 99999999999]").is_empty());
        assert!(parse_markers("no markers at all").is_empty());
    }

    #[test]
    fn excerpt_is_bounded_on_char_boundaries() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("ééééé", 2), "éé...");
    }
}
