//! Per-file leaf operations run as pool tasks.
//!
//! A token is a maximal run of characters that are not separators (see
//! [`is_separator`]). A token matches when it equals the keyword exactly: no
//! case folding, and punctuation stays part of the token (`volatile;` is not
//! `volatile`). Bytes that are not valid UTF-8 decode to U+FFFD.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::parallel::{CancelToken, TaskError};

/// Upper bound on bytes read between cancellation checks, newline or not.
const CHUNK_SIZE: usize = 64 * 1024;

const REPLACEMENT: &str = "\u{FFFD}";

/// Token separators: the Unicode space, line and paragraph separators except
/// the no-break spaces (U+00A0, U+2007, U+202F), plus the ASCII controls
/// `\t \n \x0B \x0C \r` and the information separators `\x1C`..`\x1F`.
pub fn is_separator(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n'
            | '\u{0B}'
            | '\u{0C}'
            | '\r'
            | '\u{1C}'..='\u{1F}'
            | ' '
            | '\u{1680}'
            | '\u{2000}'..='\u{2006}'
            | '\u{2008}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Number of tokens in `path` equal to `word`.
///
/// Cancellation is checked after every line and every chunk.
pub fn count_occurrences(word: &str, path: &Path, token: &CancelToken) -> Result<u64, TaskError> {
    let mut count = 0;
    scan_tokens(path, word.len(), token, |candidate| {
        if candidate == word {
            count += 1;
        }
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(count)
}

/// `path` itself if it contains `word`, a failure otherwise.
///
/// Cancellation is checked after every token so a losing search stops quickly.
pub fn find_word(word: &str, path: &Path, token: &CancelToken) -> Result<PathBuf, TaskError> {
    let found = scan_tokens(path, word.len(), token, |candidate| {
        if candidate == word {
            return Ok(ControlFlow::Break(()));
        }
        token.check()?;
        Ok(ControlFlow::Continue(()))
    });

    match found {
        Ok(true) => Ok(path.to_path_buf()),
        Ok(false) => Err(anyhow::anyhow!("'{}' not found in {}", word, path.display()).into()),
        Err(TaskError::Cancelled) => {
            tracing::debug!("Search in {} cancelled", path.display());
            Err(TaskError::Cancelled)
        }
        Err(err) => Err(err),
    }
}

type Visit<'v> = dyn FnMut(&str) -> Result<ControlFlow<()>, TaskError> + 'v;

/// Accumulates one token at a time. Tokens longer than `limit` bytes can
/// never match, so they are dropped instead of buffered.
struct Tokenizer {
    current: String,
    limit: usize,
    oversized: bool,
}

impl Tokenizer {
    fn new(limit: usize) -> Self {
        Self {
            current: String::with_capacity(limit),
            limit,
            oversized: false,
        }
    }

    fn feed(
        &mut self,
        text: &str,
        token: &CancelToken,
        visit: &mut Visit<'_>,
    ) -> Result<ControlFlow<()>, TaskError> {
        for ch in text.chars() {
            if is_separator(ch) {
                if self.flush(visit)?.is_break() {
                    return Ok(ControlFlow::Break(()));
                }
                if ch == '\n' {
                    token.check()?;
                }
            } else if !self.oversized {
                if self.current.len() + ch.len_utf8() > self.limit {
                    self.oversized = true;
                    self.current.clear();
                } else {
                    self.current.push(ch);
                }
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn flush(&mut self, visit: &mut Visit<'_>) -> Result<ControlFlow<()>, TaskError> {
        let oversized = std::mem::take(&mut self.oversized);
        if oversized || self.current.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }
        let flow = visit(&self.current);
        self.current.clear();
        flow
    }
}

/// Stream every token of `path` to `visit`, reading at most [`CHUNK_SIZE`]
/// bytes at a time. Returns true when `visit` broke out early.
fn scan_tokens<F>(
    path: &Path,
    limit: usize,
    token: &CancelToken,
    mut visit: F,
) -> Result<bool, TaskError>
where
    F: FnMut(&str) -> Result<ControlFlow<()>, TaskError>,
{
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, File::open(path)?);
    let mut tokens = Tokenizer::new(limit);
    // Incomplete UTF-8 sequence carried over from the previous chunk
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            // Truncated sequence at end of file
            if !pending.is_empty() && tokens.feed(REPLACEMENT, token, &mut visit)?.is_break() {
                return Ok(true);
            }
            return Ok(tokens.flush(&mut visit)?.is_break());
        }

        let mut bytes = std::mem::take(&mut pending);
        bytes.extend_from_slice(chunk);
        let consumed = chunk.len();
        reader.consume(consumed);

        let mut rest = bytes.as_slice();
        while !rest.is_empty() {
            let (valid, invalid) = match std::str::from_utf8(rest) {
                Ok(text) => (text, None),
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    (
                        std::str::from_utf8(valid).unwrap_or_default(),
                        Some((tail, err.error_len())),
                    )
                }
            };
            if tokens.feed(valid, token, &mut visit)?.is_break() {
                return Ok(true);
            }
            match invalid {
                None => rest = &[],
                Some((tail, Some(len))) => {
                    if tokens.feed(REPLACEMENT, token, &mut visit)?.is_break() {
                        return Ok(true);
                    }
                    rest = &tail[len..];
                }
                Some((tail, None)) => {
                    pending = tail.to_vec();
                    rest = &[];
                }
            }
        }

        token.check()?;
    }
}
