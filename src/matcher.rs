#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchConfig {
    pub find_text: String,
    pub case_sensitive: bool,
}

/// Decides whether a layer name is part of the operation. An empty find text
/// never matches; a pattern that matched everything would rename every layer
/// to the replacement.
pub fn matches(name: &str, config: &MatchConfig) -> bool {
    if config.find_text.is_empty() {
        return false;
    }
    if config.case_sensitive {
        return name.contains(&config.find_text);
    }
    !find_spans(name, &config.find_text, false).is_empty()
}

/// Byte spans of `name` that match `find_text`, found left to right and
/// non-overlapping: after a match, scanning resumes immediately past the
/// matched extent. Spans always fall on char boundaries of `name`, so they
/// are safe to slice for any input.
pub(crate) fn find_spans(name: &str, find_text: &str, case_sensitive: bool) -> Vec<(usize, usize)> {
    if find_text.is_empty() {
        return Vec::new();
    }
    let haystack: Vec<(usize, char)> = name
        .char_indices()
        .map(|(offset, ch)| (offset, if case_sensitive { ch } else { fold_char(ch) }))
        .collect();
    let needle: Vec<char> = find_text
        .chars()
        .map(|ch| if case_sensitive { ch } else { fold_char(ch) })
        .collect();

    let mut spans = Vec::new();
    let mut at = 0;
    while at + needle.len() <= haystack.len() {
        let window = &haystack[at..at + needle.len()];
        if window.iter().map(|&(_, ch)| ch).eq(needle.iter().copied()) {
            let start = window[0].0;
            let end = haystack
                .get(at + needle.len())
                .map(|&(offset, _)| offset)
                .unwrap_or(name.len());
            spans.push((start, end));
            at += needle.len();
        } else {
            at += 1;
        }
    }
    spans
}

/// Char-for-char lowercase fold. Characters whose lowercase form expands to
/// more than one char (e.g. U+0130) are kept as-is so the fold never breaks
/// the one-to-one mapping back to byte offsets in the original name.
fn fold_char(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(first), None) => first,
        _ => ch,
    }
}
