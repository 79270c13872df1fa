//! # Ingestor Module
//!
//! Edge-list text parsing for uploads.
//!
//! - One edge per line: two labels separated by whitespace and/or commas
//! - Blank lines are skipped
//! - `#` starts a comment that runs to the end of the line
//! - Any line that does not reduce to exactly two labels is rejected

use crate::primitives::{COMMENT_MARKER, MAX_EDGE_LIST_LEN};
use crate::{EchoError, Graph};

/// The Ingestor turns raw edge-list text into label pairs.
pub struct Ingestor;

impl Ingestor {
    /// Split one line into its label tokens, ignoring any comment.
    pub fn tokens(line: &str) -> Vec<&str> {
        let content = line
            .split_once(COMMENT_MARKER)
            .map_or(line, |(before, _)| before);
        content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// Parse a whole edge list into `(label, label)` pairs.
    ///
    /// # Errors
    /// Returns `EchoError::MalformedInput` with the 1-based line number and
    /// the original line text for the first line that is not a pair, or if
    /// the list exceeds `MAX_EDGE_LIST_LEN` edges.
    pub fn parse_edge_list(text: &str) -> Result<Vec<(String, String)>, EchoError> {
        let mut pairs = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let tokens = Self::tokens(line);
            match tokens.as_slice() {
                [] => continue,
                [u, v] => {
                    if pairs.len() >= MAX_EDGE_LIST_LEN {
                        return Err(EchoError::MalformedInput {
                            line: index.saturating_add(1),
                            content: format!("edge list exceeds {} pairs", MAX_EDGE_LIST_LEN),
                        });
                    }
                    pairs.push(((*u).to_string(), (*v).to_string()));
                }
                _ => {
                    return Err(EchoError::MalformedInput {
                        line: index.saturating_add(1),
                        content: line.to_string(),
                    });
                }
            }
        }

        Ok(pairs)
    }

    /// Parse an edge list and build the graph in one step.
    ///
    /// Line numbers in errors refer to the text, not to the pair index, so a
    /// self-loop on line 7 after two comment lines is still reported as line 7.
    pub fn ingest(text: &str) -> Result<Graph, EchoError> {
        let numbered = Self::numbered_pairs(text)?;
        Graph::load(numbered.iter().map(|(_, u, v)| (u.as_str(), v.as_str()))).map_err(|e| {
            match e {
                EchoError::MalformedInput { line, content } => EchoError::MalformedInput {
                    line: numbered
                        .get(line.saturating_sub(1))
                        .map_or(line, |(source_line, _, _)| *source_line),
                    content,
                },
                other => other,
            }
        })
    }

    fn numbered_pairs(text: &str) -> Result<Vec<(usize, String, String)>, EchoError> {
        let pairs = Self::parse_edge_list(text)?;
        let mut source_lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !Self::tokens(line).is_empty())
            .map(|(index, _)| index.saturating_add(1));

        Ok(pairs
            .into_iter()
            .map(|(u, v)| (source_lines.next().unwrap_or_default(), u, v))
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
