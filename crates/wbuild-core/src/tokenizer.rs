use crate::error::ParseError;
use crate::span::Span;

/// A top-level piece of markup: a tag, an argument list or free text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fragment {
    /// Trimmed content with `\[` and `\]` unescaped. `\{` and `\}` are kept
    /// as written so inline commands still see them as escapes.
    pub text: String,
    /// Trimmed location in the markup.
    pub span: Span,
    /// Closed by a real top-level `]`; only these can be tags or arguments.
    pub delimited: bool,
}

/// Whitespace runs removed before tokenizing: runs at bracket and brace
/// depth zero that directly follow a closing top-level `]` or directly
/// precede an opening top-level `[`.
pub fn whitespace_cuts(source: &str) -> Vec<Span> {
    let mut cuts = Vec::new();
    let mut brackets = 0usize;
    let mut braces = 0usize;
    let mut after_close = false;
    let mut run_start: Option<usize> = None;
    let mut chars = source.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch.is_whitespace() {
            if run_start.is_none() {
                run_start = Some(idx);
            }
            continue;
        }

        let opens_top_level = ch == '[' && brackets == 0 && braces == 0;
        if let Some(start) = run_start.take() {
            if brackets == 0 && braces == 0 && (after_close || opens_top_level) {
                cuts.push(Span { start, end: idx });
            }
        }

        if ch == '\\' {
            if let Some(&(_, next)) = chars.peek() {
                if is_escapable(next) {
                    chars.next();
                    after_close = false;
                    continue;
                }
            }
        }

        after_close = false;
        match ch {
            '{' => braces += 1,
            '}' => braces = braces.saturating_sub(1),
            '[' if braces == 0 => brackets += 1,
            ']' if braces == 0 && brackets > 0 => {
                brackets -= 1;
                after_close = brackets == 0;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        if after_close && brackets == 0 && braces == 0 {
            cuts.push(Span {
                start,
                end: source.len(),
            });
        }
    }
    cuts
}

/// The source with every [`whitespace_cuts`] range removed.
pub fn normalize_whitespace(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for cut in whitespace_cuts(source) {
        out.push_str(&source[last..cut.start]);
        last = cut.end;
    }
    out.push_str(&source[last..]);
    out
}

/// Splits markup into top-level fragments.
///
/// A `[` opens a fragment only while no `{` is open; inside a fragment,
/// brackets nest and `{...}` spans hide brackets from matching. Unmatched
/// `]` and `}` are literal text, and an unclosed `[` flushes whatever it
/// collected as text at the end of input.
pub fn tokenize(source: &str, max_depth: usize) -> Result<Vec<Fragment>, ParseError> {
    let cuts = whitespace_cuts(source);
    let mut next_cut = 0usize;
    let mut state = TokenizerState::default();
    let mut chars = source.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        while next_cut < cuts.len() && cuts[next_cut].end <= idx {
            next_cut += 1;
        }
        if next_cut < cuts.len() && cuts[next_cut].start <= idx {
            continue;
        }

        if ch == '\\' {
            if let Some(&(next_idx, next)) = chars.peek() {
                if is_escapable(next) {
                    chars.next();
                    state.mark_start(idx);
                    if next == '{' || next == '}' {
                        state.buffer.push('\\');
                    }
                    state.buffer.push(next);
                    state.last_end = next_idx + next.len_utf8();
                    continue;
                }
            }
        }

        match ch {
            '{' => {
                state.braces += 1;
                state.check_depth(max_depth, idx)?;
                state.push(idx, ch);
            }
            '}' => {
                state.braces = state.braces.saturating_sub(1);
                state.push(idx, ch);
            }
            '[' if state.braces == 0 => {
                if state.brackets == 0 {
                    state.flush(source, idx, false);
                }
                state.brackets += 1;
                state.check_depth(max_depth, idx)?;
                state.push(idx, ch);
            }
            ']' if state.braces == 0 && state.brackets > 0 => {
                state.push(idx, ch);
                state.brackets -= 1;
                if state.brackets == 0 {
                    state.flush(source, idx + 1, true);
                }
            }
            _ => state.push(idx, ch),
        }
    }

    let end = source.len();
    state.flush(source, end, false);
    tracing::debug!(fragments = state.fragments.len(), "tokenized markup");
    Ok(state.fragments)
}

fn is_escapable(ch: char) -> bool {
    matches!(ch, '[' | ']' | '{' | '}')
}

#[derive(Default)]
struct TokenizerState {
    fragments: Vec<Fragment>,
    buffer: String,
    start: Option<usize>,
    last_end: usize,
    brackets: usize,
    braces: usize,
}

impl TokenizerState {
    fn mark_start(&mut self, idx: usize) {
        if self.start.is_none() {
            self.start = Some(idx);
        }
    }

    fn push(&mut self, idx: usize, ch: char) {
        self.mark_start(idx);
        self.buffer.push(ch);
        self.last_end = idx + ch.len_utf8();
    }

    fn check_depth(&self, max_depth: usize, idx: usize) -> Result<(), ParseError> {
        if self.brackets + self.braces > max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: max_depth,
                span: Some(Span {
                    start: idx,
                    end: idx + 1,
                }),
            });
        }
        Ok(())
    }

    fn flush(&mut self, source: &str, end: usize, delimited: bool) {
        let buffer = std::mem::take(&mut self.buffer);
        let Some(start) = self.start.take() else {
            return;
        };
        let text = buffer.trim();
        if text.is_empty() {
            return;
        }
        let raw = Span {
            start,
            end: end.max(self.last_end).min(source.len()),
        };
        self.fragments.push(Fragment {
            text: text.to_string(),
            span: raw.trimmed(source),
            delimited,
        });
    }
}
