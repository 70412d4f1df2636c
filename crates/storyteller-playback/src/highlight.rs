//! Maps playback time onto the words of a story segment.

/// A story segment split into its spoken and unspoken halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSplit<'a> {
    /// Words already reached by playback.
    pub highlighted: &'a str,
    /// Words not yet reached.
    pub remaining: &'a str,
}

/// Number of whitespace-delimited words in `text`.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Splits `text` at the word reached after `current_time` of `duration`
/// seconds.
///
/// A duration that is not a positive finite number means the audio has
/// not loaded, so nothing is highlighted. A non-finite `current_time`
/// counts as zero. Whitespace inside each half is kept as written; the
/// whitespace between the halves belongs to neither.
#[must_use]
pub fn highlight_split(text: &str, current_time: f64, duration: f64) -> HighlightSplit<'_> {
    let spans = word_spans(text);
    let reached = highlighted_words(spans.len(), current_time, duration);

    if reached == 0 {
        return HighlightSplit {
            highlighted: "",
            remaining: text,
        };
    }
    if reached >= spans.len() {
        return HighlightSplit {
            highlighted: text,
            remaining: "",
        };
    }

    let (_, end) = spans[reached - 1];
    let (start, _) = spans[reached];
    HighlightSplit {
        highlighted: &text[..end],
        remaining: &text[start..],
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn highlighted_words(total: usize, current_time: f64, duration: f64) -> usize {
    if !duration.is_finite() || duration <= 0.0 {
        return 0;
    }
    let current_time = if current_time.is_finite() {
        current_time
    } else {
        0.0
    };
    let progress = (current_time / duration).clamp(0.0, 1.0);
    ((total as f64) * progress).floor() as usize
}

/// Byte ranges of each word.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (index, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(begin)) => {
                spans.push((begin, index));
                start = None;
            }
            (false, None) => start = Some(index),
            _ => {}
        }
    }
    if let Some(begin) = start {
        spans.push((begin, text.len()));
    }
    spans
}
