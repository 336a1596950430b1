//! Reference citation splitting
//!
//! Curated free text may embed literature citations in parentheses, e.g.
//! `"sensitivity to RAF inhibitors (PMID: 25265492)"`. This module splits
//! such text into literal and citation segments with a single left-to-right
//! scan, tracking parenthesis nesting so parentheses embedded inside a
//! citation do not terminate it prematurely.

/// Identifier prefixes that mark a parenthesized span as a citation.
/// The prefix must immediately follow the opening parenthesis.
pub const REFERENCE_IDENTIFIERS: &[&str] = &["PMID:", "NCT", "Abstract:"];

/// One segment of a split text: verbatim literal text, or a citation
/// span including its surrounding parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSegment {
    Literal(String),
    Citation(String),
}

impl ReferenceSegment {
    pub fn text(&self) -> &str {
        match self {
            ReferenceSegment::Literal(text) | ReferenceSegment::Citation(text) => text,
        }
    }

    pub fn is_citation(&self) -> bool {
        matches!(self, ReferenceSegment::Citation(_))
    }
}

/// A citation decomposed into its identifier prefix and trailing content,
/// e.g. `(PMID: 25265492)` -> prefix `PMID:`, content `25265492`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub prefix: String,
    pub content: String,
}

impl ParsedReference {
    /// Full display name of the reference, prefix included.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.prefix, self.content)
    }
}

/// Split `input` into literal and citation segments.
///
/// A citation begins at a `(` immediately followed by one of
/// [`REFERENCE_IDENTIFIERS`] and ends when its parenthesis nesting depth
/// returns to zero. A citation still open at the end of input is emitted
/// as a citation spanning to the end of input rather than rejected.
pub fn split_references(input: &str) -> Vec<ReferenceSegment> {
    let bytes = input.as_bytes();
    let mut segments = Vec::new();
    let mut last_index = 0;
    let mut start_index: Option<usize> = None;
    let mut nesting = 0usize;

    for i in 0..bytes.len() {
        match start_index {
            None => {
                if bytes[i] == b'(' && starts_with_identifier(&input[i + 1..]) {
                    if i > last_index {
                        segments.push(ReferenceSegment::Literal(input[last_index..i].to_string()));
                    }
                    start_index = Some(i);
                    nesting = 1;
                }
            }
            Some(start) => {
                if bytes[i] == b'(' {
                    nesting += 1;
                } else if bytes[i] == b')' {
                    nesting -= 1;
                    if nesting == 0 {
                        segments.push(ReferenceSegment::Citation(input[start..=i].to_string()));
                        last_index = i + 1;
                        start_index = None;
                    }
                }
            }
        }
    }

    // Unterminated citation spans to the end of input.
    if let Some(start) = start_index {
        segments.push(ReferenceSegment::Citation(input[start..].to_string()));
        return segments;
    }

    if last_index < input.len() {
        segments.push(ReferenceSegment::Literal(input[last_index..].to_string()));
    }

    segments
}

/// Extract the distinct references cited in `text`, in encounter order.
/// Two citations with the same content are reported once.
pub fn parse_text_for_references(text: &str) -> Vec<ParsedReference> {
    let mut references: Vec<ParsedReference> = Vec::new();

    for segment in split_references(text) {
        let ReferenceSegment::Citation(citation) = segment else {
            continue;
        };
        let inner = citation.strip_prefix('(').unwrap_or(&citation);
        let inner = inner.strip_suffix(')').unwrap_or(inner);
        let Some(prefix) = REFERENCE_IDENTIFIERS
            .iter()
            .find(|identifier| inner.starts_with(**identifier))
        else {
            continue;
        };
        for content in inner[prefix.len()..].split(',') {
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            if references.iter().any(|existing| existing.content == content) {
                continue;
            }
            references.push(ParsedReference {
                prefix: (*prefix).to_string(),
                content: content.to_string(),
            });
        }
    }

    references
}

fn starts_with_identifier(rest: &str) -> bool {
    REFERENCE_IDENTIFIERS
        .iter()
        .any(|identifier| rest.starts_with(identifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_literal() {
        let segments = split_references("no citations here");
        assert_eq!(
            segments,
            vec![ReferenceSegment::Literal("no citations here".to_string())]
        );
    }

    #[test]
    fn test_empty_input_yields_no_segments() {
        assert!(split_references("").is_empty());
    }

    #[test]
    fn test_citation_is_split_out() {
        let segments = split_references("responds to BRAFi (PMID: 25265492) in melanoma");
        assert_eq!(
            segments,
            vec![
                ReferenceSegment::Literal("responds to BRAFi ".to_string()),
                ReferenceSegment::Citation("(PMID: 25265492)".to_string()),
                ReferenceSegment::Literal(" in melanoma".to_string()),
            ]
        );
    }

    #[test]
    fn test_nested_parentheses_inside_citation() {
        let segments = split_references("text (PMID: 123 (supplement (figure 2))) tail");
        assert_eq!(
            segments[1],
            ReferenceSegment::Citation("(PMID: 123 (supplement (figure 2)))".to_string())
        );
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_unrecognized_parenthetical_stays_literal() {
        let segments = split_references("V600E (a plain note)");
        assert_eq!(
            segments,
            vec![ReferenceSegment::Literal("V600E (a plain note)".to_string())]
        );
    }

    #[test]
    fn test_unterminated_citation_spans_to_end() {
        let segments = split_references("text (PMID: 123, 456");
        assert_eq!(
            segments,
            vec![
                ReferenceSegment::Literal("text ".to_string()),
                ReferenceSegment::Citation("(PMID: 123, 456".to_string()),
            ]
        );
    }

    #[test]
    fn test_multiple_citation_kinds() {
        let segments = split_references("(PMID: 1) and (Abstract: Smith 2020) and (NCT01234567)");
        let citations: Vec<_> = segments.iter().filter(|s| s.is_citation()).collect();
        assert_eq!(citations.len(), 3);
    }

    #[test]
    fn test_parse_text_for_references_dedupes_by_content() {
        let references = parse_text_for_references("(PMID: 123, 456) later again (PMID: 123)");
        assert_eq!(
            references,
            vec![
                ParsedReference {
                    prefix: "PMID:".to_string(),
                    content: "123".to_string()
                },
                ParsedReference {
                    prefix: "PMID:".to_string(),
                    content: "456".to_string()
                },
            ]
        );
        assert_eq!(references[0].full_name(), "PMID:123");
    }
}
