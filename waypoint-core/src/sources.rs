//! Source and citation extraction
//!
//! Sources arrive in two shapes: flat `source-url` parts, and `source`
//! parts wrapping a nested record (plus, for network traces, a
//! `sources` array inside the web-search step's output). Extraction
//! preserves first-seen order and deliberately does not deduplicate:
//! the same page cited by two tools keeps both entries.

use serde_json::Value;

use crate::message::{Part, SourceRecord};

/// Collect sources from a message's part list. Returns `None` when no
/// source part is present, never an empty list.
pub fn sources_from_parts(parts: &[Part]) -> Option<Vec<SourceRecord>> {
    let mut sources = Vec::new();
    for part in parts {
        match part {
            Part::SourceUrl(record) if !record.url.is_empty() => {
                sources.push(record.clone());
            }
            Part::Source(wrapped) if !wrapped.source.url.is_empty() => {
                sources.push(wrapped.source.clone());
            }
            _ => {}
        }
    }
    (!sources.is_empty()).then_some(sources)
}

/// Collect sources from one step's tool output (`{ "sources": [...] }`).
/// Entries without a usable `url` are skipped; a malformed or missing
/// array is treated as "no data".
pub fn sources_from_step_output(output: &Value) -> Option<Vec<SourceRecord>> {
    let entries = output.get("sources")?.as_array()?;
    let sources: Vec<SourceRecord> = entries
        .iter()
        .filter_map(|entry| {
            let record: SourceRecord = serde_json::from_value(entry.clone()).ok()?;
            (!record.url.is_empty()).then_some(record)
        })
        .collect();
    (!sources.is_empty()).then_some(sources)
}

// ============================================================================
// Citation markup
// ============================================================================

/// One fragment of citation-annotated text.
#[derive(Clone, Debug, PartialEq)]
pub enum TextSegment {
    Plain(String),
    /// An inline `[n]` marker resolved against the source list.
    /// `number` is the 1-indexed marker as written.
    Citation {
        number: usize,
        source: SourceRecord,
    },
}

/// Whether `text` contains at least one `[n]` citation marker.
pub fn has_citations(text: &str) -> bool {
    find_marker(text, 0).is_some()
}

/// Find the next `[digits]` marker at or after `from`. Returns the
/// marker's byte range and its parsed number.
fn find_marker(text: &str, from: usize) -> Option<(usize, usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            let digits_start = i + 1;
            let mut j = digits_start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > digits_start && j < bytes.len() && bytes[j] == b']' {
                if let Ok(number) = text[digits_start..j].parse::<usize>() {
                    return Some((i, j + 1, number));
                }
            }
        }
        i += 1;
    }
    None
}

/// Split text on `[n]` markers, resolving each against `sources[n-1]`.
/// Out-of-range markers (including `[0]`) stay literal text; this is a
/// rendering concern, never an error.
pub fn split_citations(text: &str, sources: &[SourceRecord]) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some((start, end, number)) = find_marker(text, cursor) {
        let resolved = number
            .checked_sub(1)
            .and_then(|index| sources.get(index));

        match resolved {
            Some(source) => {
                if start > plain_start {
                    segments.push(TextSegment::Plain(text[plain_start..start].to_string()));
                }
                segments.push(TextSegment::Citation {
                    number,
                    source: source.clone(),
                });
                plain_start = end;
            }
            None => {
                // Unresolvable marker: leave it in the surrounding text.
            }
        }
        cursor = end;
    }

    if plain_start < text.len() {
        segments.push(TextSegment::Plain(text[plain_start..].to_string()));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::WrappedSource;

    fn source(url: &str) -> SourceRecord {
        SourceRecord::new(url)
    }

    #[test]
    fn test_extracts_both_source_shapes_in_order() {
        let parts = vec![
            Part::text("hello"),
            Part::SourceUrl(source("https://a")),
            Part::Source(WrappedSource {
                source: source("https://b"),
            }),
        ];
        let sources = sources_from_parts(&parts).expect("sources");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, "https://a");
        assert_eq!(sources[1].url, "https://b");
    }

    #[test]
    fn test_no_source_parts_yields_none() {
        let parts = vec![Part::text("hello")];
        assert_eq!(sources_from_parts(&parts), None);
    }

    #[test]
    fn test_keeps_duplicate_urls() {
        // Deliberate: two tools citing the same page keep both entries,
        // so citation numbering stays aligned with the upstream text.
        let parts = vec![
            Part::SourceUrl(source("https://a")),
            Part::SourceUrl(source("https://a")),
        ];
        let sources = sources_from_parts(&parts).expect("sources");
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_step_output_skips_malformed_entries() {
        let output = serde_json::json!({
            "sources": [
                { "url": "https://a", "title": "A" },
                { "title": "no url" },
                42,
            ]
        });
        let sources = sources_from_step_output(&output).expect("sources");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://a");
    }

    #[test]
    fn test_missing_sources_array_is_no_data() {
        assert_eq!(sources_from_step_output(&serde_json::json!({})), None);
        assert_eq!(
            sources_from_step_output(&serde_json::json!({ "sources": [] })),
            None
        );
    }

    #[test]
    fn test_split_citations_basic() {
        let sources = vec![source("https://a"), source("https://b")];
        let segments = split_citations("Visit [1] and [2].", &sources);
        assert_eq!(
            segments,
            vec![
                TextSegment::Plain("Visit ".to_string()),
                TextSegment::Citation {
                    number: 1,
                    source: sources[0].clone()
                },
                TextSegment::Plain(" and ".to_string()),
                TextSegment::Citation {
                    number: 2,
                    source: sources[1].clone()
                },
                TextSegment::Plain(".".to_string()),
            ]
        );
    }

    #[test]
    fn test_out_of_range_markers_stay_literal() {
        let sources = vec![source("https://a")];
        let segments = split_citations("See [1], [5] and [0].", &sources);
        assert_eq!(
            segments,
            vec![
                TextSegment::Plain("See ".to_string()),
                TextSegment::Citation {
                    number: 1,
                    source: sources[0].clone()
                },
                TextSegment::Plain(", [5] and [0].".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_numeric_brackets_are_ignored() {
        assert!(!has_citations("array[index] and [notes]"));
        let segments = split_citations("array[index]", &[source("https://a")]);
        assert_eq!(segments, vec![TextSegment::Plain("array[index]".to_string())]);
    }
}
