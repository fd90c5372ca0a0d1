/// Filler words stripped from derived item labels.
pub const ITEM_STOPWORDS: [&str; 12] = [
    "spent", "on", "from", "rupees", "rs", "the", "a", "an", "for", "to", "my", "home",
];

pub const ITEM_MAX_CHARS: usize = 50;

/// Truncates to at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Lower-cases, drops stopwords and caps the length of a model-supplied item.
///
/// When every word is a stopword the lower-cased original is kept instead.
pub fn clean_item(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let kept: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| !ITEM_STOPWORDS.contains(w))
        .collect();

    if kept.is_empty() {
        truncate_chars(lowered.trim(), ITEM_MAX_CHARS)
    } else {
        truncate_chars(&kept.join(" "), ITEM_MAX_CHARS)
    }
}

// Zero digit of each decimal numeral block users are likely to type amounts in.
const DIGIT_ZEROS: [char; 11] = [
    '\u{0660}', // Arabic-Indic
    '\u{06F0}', // Extended Arabic-Indic
    '\u{0966}', // Devanagari
    '\u{09E6}', // Bengali
    '\u{0A66}', // Gurmukhi
    '\u{0AE6}', // Gujarati
    '\u{0B66}', // Odia
    '\u{0BE6}', // Tamil
    '\u{0C66}', // Telugu
    '\u{0CE6}', // Kannada
    '\u{0D66}', // Malayalam
];

/// Rewrites Indic and Arabic-Indic digits as ASCII so amounts like "५००" parse.
pub fn ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| {
            DIGIT_ZEROS
                .iter()
                .find_map(|&zero| {
                    let offset = (c as u32).checked_sub(zero as u32)?;
                    (offset < 10).then(|| char::from(b'0' + offset as u8))
                })
                .unwrap_or(c)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_stopwords_preserving_order() {
        assert_eq!(clean_item("the pizza from swiggy"), "pizza swiggy");
        assert_eq!(clean_item("Spent on My Phone Charger"), "phone charger");
    }

    #[test]
    fn keeps_original_when_only_stopwords() {
        assert_eq!(clean_item("For The"), "for the");
    }

    #[test]
    fn caps_length_in_characters() {
        let long = "₹".repeat(80);
        assert_eq!(clean_item(&long).chars().count(), ITEM_MAX_CHARS);
    }

    #[test]
    fn maps_indic_digits_to_ascii() {
        assert_eq!(ascii_digits("₹५०० for pizza"), "₹500 for pizza");
        assert_eq!(ascii_digits("৩২০ টাকা"), "320 টাকা");
        assert_eq!(ascii_digits("٤٥.٥"), "45.5");
        assert_eq!(ascii_digits("100 for tea"), "100 for tea");
    }
}
