//! Alteration expression parsing
//!
//! Curators enter alterations as free text in a small grammar:
//!
//! ```text
//! V600E/K [Class 2] {excluding V600E; V600K (germline)} (seen in cSCC)
//! ```
//!
//! An expression carries up to four parts: one or more base alterations
//! (`/`-separated alias shorthand), an optional display name in `[...]`,
//! an optional exclusion clause in `{excluding ...}`, and an optional
//! parenthesized comment. [`parse_alteration_name`] decomposes an
//! expression into one [`ParsedAlterationFragment`] per expanded branch.
//! Parsing is total: malformed input degrades to a best-effort fragment
//! rather than an error.
//!
//! Bracket, brace, and parenthesis extraction is done with single-pass
//! scanners carrying a nesting depth counter; only the anchored alias
//! shorthand pattern uses a regex.

use regex::Regex;
use std::sync::LazyLock;

/// One atomic alteration parsed out of a free-text expression, together
/// with the metadata shared by every branch of that expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedAlterationFragment {
    /// The base alteration, trimmed, e.g. `V600E`.
    pub alteration: String,
    /// Alterations excluded from the scope of this one, already expanded.
    pub excluding: Vec<String>,
    /// Inline comment with its outer parentheses stripped.
    pub comment: String,
    /// Display name from a `[...]` segment, empty when absent.
    pub name: String,
}

static ALIAS_SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([A-Z])\s*([0-9]+)\s*([A-Z])\s*((?:/\s*[A-Z]\s*)*)$")
        .expect("alias shorthand pattern is valid")
});

/// Expand `/`-separated alias shorthand into fully qualified alterations:
/// `V600E/K` becomes `["V600E", "V600K"]`. Text that does not match the
/// shorthand pattern is returned as-is in a single-element vector.
pub fn expand_alteration_name(name: &str) -> Vec<String> {
    let Some(captures) = ALIAS_SHORTHAND.captures(name) else {
        return vec![name.to_string()];
    };

    let first_part = format!("{}{}", &captures[1], &captures[2]);
    let mut alterations = vec![format!("{first_part}{}", &captures[3])];

    // The continuation group keeps its leading slash; strip it before
    // splitting the remaining alleles.
    let continuations = &captures[4];
    if let Some(rest) = continuations.strip_prefix('/') {
        for allele in rest.split('/') {
            alterations.push(format!("{first_part}{}", allele.trim()));
        }
    }

    alterations
}

/// Parse a free-text alteration expression into one fragment per expanded
/// branch. All fragments of one expression share the same `excluding`,
/// `comment`, and `name`. Never fails; fragments whose base alteration
/// trims to empty are dropped.
pub fn parse_alteration_name(expression: &str) -> Vec<ParsedAlterationFragment> {
    let mut residual = expression.to_string();

    let name = extract_display_name(&mut residual);
    let excluding = extract_exclusion_clause(&mut residual);
    let comment = extract_comment(&mut residual);

    expand_alteration_name(residual.trim())
        .into_iter()
        .filter(|alteration| !alteration.trim().is_empty())
        .map(|alteration| ParsedAlterationFragment {
            alteration: alteration.trim().to_string(),
            excluding: excluding.clone(),
            comment: comment.clone(),
            name: name.clone(),
        })
        .collect()
}

/// Compose the display string of a resolved alteration back from its
/// parts, in grammar order. The comment can be omitted, which is how the
/// session derives its duplicate pre-check name list.
pub fn full_alteration_name(
    alteration: &str,
    name: &str,
    excluding: &[String],
    comment: &str,
) -> String {
    let mut full = alteration.to_string();
    if !name.is_empty() && name != alteration {
        full.push_str(&format!(" [{name}]"));
    }
    if !excluding.is_empty() {
        full.push_str(&format!(" {{excluding {}}}", excluding.join("; ")));
    }
    if !comment.is_empty() {
        full.push_str(&format!(" ({comment})"));
    }
    full
}

/// Remove the first `[...]` span from `residual` and return its content.
fn extract_display_name(residual: &mut String) -> String {
    let Some(open) = residual.find('[') else {
        return String::new();
    };
    let Some(close_offset) = residual[open + 1..].find(']') else {
        return String::new();
    };
    let close = open + 1 + close_offset;
    let name = residual[open + 1..close].to_string();
    residual.replace_range(open..=close, "");
    name
}

/// Remove the first `{excluding ...}` span from `residual` and return the
/// expanded exclusion names in encounter order. A brace group not led by
/// the `excluding` keyword is left untouched.
fn extract_exclusion_clause(residual: &mut String) -> Vec<String> {
    let mut search_from = 0;
    while let Some(open_offset) = residual[search_from..].find('{') {
        let open = search_from + open_offset;
        let Some(close_offset) = residual[open + 1..].find('}') else {
            return Vec::new();
        };
        let close = open + 1 + close_offset;
        let content = residual[open + 1..close].trim_start();
        let led_by_keyword = content
            .get(.."excluding".len())
            .is_some_and(|head| head.eq_ignore_ascii_case("excluding"));
        if led_by_keyword {
            let names = content["excluding".len()..].to_string();
            residual.replace_range(open..=close, "");
            let mut excluding = Vec::new();
            for piece in names.split(';') {
                excluding.extend(expand_alteration_name(piece.trim()));
            }
            return excluding;
        }
        search_from = close + 1;
    }
    Vec::new()
}

/// Capture the first complete top-level parenthesized span of `residual`
/// as the comment (outer parentheses stripped, nested ones kept) and
/// remove that one occurrence. An unterminated span yields no comment.
fn extract_comment(residual: &mut String) -> String {
    let mut depth = 0usize;
    let mut comment = String::new();
    let mut complete = false;

    for c in residual.chars() {
        match c {
            '(' => {
                if depth > 0 {
                    comment.push(c);
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth > 0 {
                    comment.push(c);
                }
            }
            _ if depth > 0 => comment.push(c),
            _ => {}
        }
        if depth == 0 && !comment.is_empty() {
            complete = true;
            break;
        }
    }

    if !complete {
        return String::new();
    }

    let span = format!("({comment})");
    if let Some(at) = residual.find(&span) {
        residual.replace_range(at..at + span.len(), "");
    }
    comment
}
