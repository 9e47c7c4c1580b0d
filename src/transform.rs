use crate::matcher::{MatchConfig, find_spans};

#[derive(Debug, Clone, Default)]
pub struct ReplaceConfig {
    pub matching: MatchConfig,
    pub replace_text: String,
}

/// Computes the renamed value for a layer name. Every occurrence of the find
/// text is replaced with the replacement exactly as given; the surrounding
/// unmatched text keeps its original bytes, including its case when matching
/// is case-insensitive. Occurrences are the scanner's non-overlapping spans
/// over the original name, so text inserted by one substitution is never
/// re-matched within the same call. Names without an occurrence come back
/// unchanged, as does any name when the find text is empty.
pub fn replace_name(name: &str, config: &ReplaceConfig) -> String {
    let spans = find_spans(
        name,
        &config.matching.find_text,
        config.matching.case_sensitive,
    );
    if spans.is_empty() {
        return name.to_string();
    }

    let mut renamed = String::with_capacity(name.len());
    let mut cursor = 0;
    for (start, end) in spans {
        renamed.push_str(&name[cursor..start]);
        renamed.push_str(&config.replace_text);
        cursor = end;
    }
    renamed.push_str(&name[cursor..]);
    renamed
}
