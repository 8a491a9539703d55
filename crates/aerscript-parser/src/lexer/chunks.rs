//! Splitting a document into raw text and code spans.
//!
//! In embedded mode a source file is markup with code islands:
//!
//! ```text
//! Hello <?aer print($name); ?> and goodbye.
//! ```
//!
//! Raw spans are passed through untouched; code spans are tokenized. The
//! opening tag is `<?` optionally followed by `aer` (any case); the closing
//! tag is `?>`, ignored inside comments.

/// What a [`Chunk`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Raw,
    Code,
}

/// One span of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'src> {
    pub kind: ChunkKind,
    pub text: &'src str,
    /// Line where the chunk starts.
    pub line: u32,
}

/// Split an embedded document into alternating raw and code chunks.
///
/// Empty chunks are dropped. Trailing whitespace of a code chunk is trimmed.
pub fn split_embedded(source: &str) -> Vec<Chunk<'_>> {
    let bytes = source.as_bytes();
    let mut chunks = Vec::new();
    let mut pos = 0usize;
    let mut line = 1u32;

    while pos < bytes.len() {
        // Raw text up to the opening tag.
        let raw_start = pos;
        let raw_line = line;
        let mut code_start = None;
        while pos < bytes.len() {
            if bytes[pos] == b'<' && bytes.get(pos + 1) == Some(&b'?') {
                let raw_end = pos;
                pos += 2;
                if source[pos..].len() >= 3 && source[pos..pos + 3].eq_ignore_ascii_case("aer") {
                    pos += 3;
                }
                code_start = Some(raw_end);
                break;
            }
            if bytes[pos] == b'\n' {
                line += 1;
            }
            pos += 1;
        }
        let raw_end = code_start.unwrap_or(pos);
        if raw_end > raw_start {
            chunks.push(Chunk {
                kind: ChunkKind::Raw,
                text: &source[raw_start..raw_end],
                line: raw_line,
            });
        }
        if code_start.is_none() {
            break;
        }

        // Skip leading whitespace of the code island.
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            if bytes[pos] == b'\n' {
                line += 1;
            }
            pos += 1;
        }

        let code_begin = pos;
        let code_line = line;
        let mut code_end = bytes.len();
        while pos < bytes.len() {
            match bytes[pos] {
                b'?' if bytes.get(pos + 1) == Some(&b'>') => {
                    code_end = pos;
                    break;
                }
                b'#' => {
                    while pos < bytes.len() && bytes[pos] != b'\n' {
                        pos += 1;
                    }
                    continue;
                }
                b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                    while pos < bytes.len() && bytes[pos] != b'\n' {
                        pos += 1;
                    }
                    continue;
                }
                b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                    pos += 2;
                    while pos < bytes.len() && !(bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/')) {
                        if bytes[pos] == b'\n' {
                            line += 1;
                        }
                        pos += 1;
                    }
                    pos = (pos + 2).min(bytes.len());
                    continue;
                }
                b'\n' => line += 1,
                _ => {}
            }
            pos += 1;
        }

        let text = source[code_begin..code_end].trim_end();
        if !text.is_empty() {
            chunks.push(Chunk {
                kind: ChunkKind::Code,
                text,
                line: code_line,
            });
        }
        // Jump the closing tag.
        pos = (code_end + 2).min(bytes.len());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_raw_chunk() {
        let chunks = split_embedded("just text\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Raw);
    }

    #[test]
    fn alternating_chunks() {
        let chunks = split_embedded("a <?aer $x = 1; ?> b <? $y; ?>");
        let kinds: Vec<_> = chunks.iter().map(|c| (c.kind, c.text)).collect();
        assert_eq!(
            kinds,
            vec![
                (ChunkKind::Raw, "a "),
                (ChunkKind::Code, "$x = 1;"),
                (ChunkKind::Raw, " b "),
                (ChunkKind::Code, "$y;"),
            ]
        );
    }

    #[test]
    fn closing_tag_inside_comment_is_ignored() {
        let chunks = split_embedded("<?aer // not ?> here\n$a; ?>tail");
        assert_eq!(chunks[0].kind, ChunkKind::Code);
        assert!(chunks[0].text.ends_with("$a;"));
        assert_eq!(chunks[1].text, "tail");
    }

    #[test]
    fn unclosed_code_runs_to_end() {
        let chunks = split_embedded("<?aer\n\n$a = 1;");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "$a = 1;");
        assert_eq!(chunks[0].line, 3);
    }
}
