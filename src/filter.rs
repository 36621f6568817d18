//! Real-time removal of `<think>…</think>` reasoning blocks from model output.
//!
//! [`ThinkTagFilter`] consumes a completion one token at a time and hands back
//! only the text a reader should see, holding back just enough characters to
//! recognize a marker that arrives split across two tokens. Already-complete
//! text (a cached replay) goes through [`ThinkTagFilter::process_full_text`]
//! instead, which never touches the streaming state.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker that opens a reasoning block.
pub const THINK_OPEN: &str = "<think>";
/// Marker that closes a reasoning block.
pub const THINK_CLOSE: &str = "</think>";

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think block pattern is valid"));

/// Where the streaming filter is within the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// No open marker seen yet; text is visible but the tail is held back.
    AwaitingOpenTag,
    /// Inside a reasoning block; everything is discarded.
    InsideThinkBlock,
    /// The first block closed; everything passes through untouched.
    StreamingVisible,
}

/// Streaming filter for `<think>` blocks.
///
/// Only the first reasoning block is removed from a stream. Once its close
/// marker has been seen the filter passes everything through verbatim,
/// including any later `<think>` markers. A close marker that never arrives
/// suppresses all remaining output.
///
/// One instance serves one generation at a time; call [`reset`](Self::reset)
/// before reusing it.
#[derive(Debug)]
pub struct ThinkTagFilter {
    state: FilterState,
    buffer: String,
}

impl Default for ThinkTagFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkTagFilter {
    pub fn new() -> Self {
        Self {
            state: FilterState::AwaitingOpenTag,
            buffer: String::new(),
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Still before the end of the reasoning block (or before any visible text).
    pub fn is_thinking(&self) -> bool {
        self.state != FilterState::StreamingVisible
    }

    /// Feed one streamed token and return the text that became visible.
    ///
    /// The return value may be empty. Concatenating every return value (plus
    /// [`finish`](Self::finish)) yields the visible text in order, with
    /// nothing duplicated.
    pub fn process_token(&mut self, token: &str) -> String {
        self.buffer.push_str(token);
        let mut visible = String::new();

        loop {
            match self.state {
                FilterState::AwaitingOpenTag => {
                    if let Some(idx) = self.buffer.find(THINK_OPEN) {
                        visible.push_str(&self.buffer[..idx]);
                        self.buffer.drain(..idx + THINK_OPEN.len());
                        self.state = FilterState::InsideThinkBlock;
                        continue;
                    }

                    let split = held_back_start(&self.buffer, THINK_OPEN.len() - 1);
                    visible.push_str(&self.buffer[..split]);
                    self.buffer.drain(..split);
                    return visible;
                }
                FilterState::InsideThinkBlock => {
                    if let Some(idx) = self.buffer.find(THINK_CLOSE) {
                        self.buffer.drain(..idx + THINK_CLOSE.len());
                        self.state = FilterState::StreamingVisible;
                        continue;
                    }

                    let split = held_back_start(&self.buffer, THINK_CLOSE.len() - 1);
                    self.buffer.drain(..split);
                    return visible;
                }
                FilterState::StreamingVisible => {
                    visible.push_str(&self.buffer);
                    self.buffer.clear();
                    return visible;
                }
            }
        }
    }

    /// Flush text held back at the end of a stream.
    ///
    /// Only a stream that never opened a reasoning block has anything left
    /// to release; a block that never closed stays suppressed.
    pub fn finish(&mut self) -> String {
        match self.state {
            FilterState::AwaitingOpenTag => std::mem::take(&mut self.buffer),
            FilterState::InsideThinkBlock | FilterState::StreamingVisible => {
                self.buffer.clear();
                String::new()
            }
        }
    }

    /// Remove every `<think>…</think>` block from complete text and trim it.
    pub fn process_full_text(&self, text: &str) -> String {
        strip_think_blocks(text)
    }

    /// Return to [`FilterState::AwaitingOpenTag`] with an empty buffer.
    pub fn reset(&mut self) {
        self.state = FilterState::AwaitingOpenTag;
        self.buffer.clear();
    }
}

/// Remove every non-greedy `<think>…</think>` pair and trim the result.
pub fn strip_think_blocks(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Byte offset from which `buffer` keeps at most `keep` trailing characters.
fn held_back_start(buffer: &str, keep: usize) -> usize {
    if keep == 0 {
        return buffer.len();
    }
    buffer
        .char_indices()
        .rev()
        .nth(keep - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
