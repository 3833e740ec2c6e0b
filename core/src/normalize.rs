use crate::stopwords::is_article_stopword;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\w+").expect("valid regex");
    static ref TAG_RE: Regex = Regex::new(r"<.*?>").expect("valid regex");
    // Letter categories only: letter-like numerals (Ⅻ) and combining marks do not count.
    static ref LETTERS_RE: Regex = Regex::new(r"^\p{L}+$").expect("valid regex");
}

/// Clean raw article text into a space-joined token string: lowercase, keep tokens made only
/// of letters that are not stopwords, re-tokenize on word characters, strip `<...>` markup.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let kept: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| LETTERS_RE.is_match(w) && !is_article_stopword(w))
        .collect();
    let joined = kept.join(" ");
    let words: Vec<&str> = WORD_RE.find_iter(&joined).map(|m| m.as_str()).collect();
    TAG_RE.replace_all(&words.join(" "), "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_punctuated_and_stopword_tokens() {
        assert_eq!(normalize("The quick, brown fox jumps over THE lazy dog!"), "quick brown fox jumps lazy dog");
    }

    #[test]
    fn empty_and_all_stopwords() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("the and of a"), "");
    }
}
