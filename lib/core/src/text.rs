// Shared tokenization for the lexical and sparse backends

/// Split on whitespace and ASCII punctuation, drop single characters.
#[inline]
pub fn tokenize(text: &str, lowercase: bool) -> Vec<String> {
    let normalized;
    let source = if lowercase {
        normalized = text.to_lowercase();
        normalized.as_str()
    } else {
        text
    };

    source
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|s| s.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "been", "being", "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing",
    "each", "few", "for", "from", "further", "had", "has", "have", "having", "here", "how", "however",
    "if", "in", "into", "is", "it", "its", "itself", "more", "most", "much", "must", "no", "nor", "not",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over", "own", "same", "should",
    "so", "some", "such", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "upon", "very", "via", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "within", "without",
    "would", "you", "your",
];

/// Case-insensitive stopword check
#[inline]
pub fn is_stopword(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    STOPWORDS.binary_search(&lower.as_str()).is_ok()
}
