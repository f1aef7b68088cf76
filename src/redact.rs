//! Buyer-name masking for personal-data display.
//!
//! Toasts show who bought what; the buyer's name is masked per word so the
//! notification stays social proof without leaking identities.

/// Mask a personal name for display.
///
/// Each whitespace-separated word keeps its first character (first two for
/// words longer than two characters) and replaces the rest with `*`. Words
/// are rejoined with single spaces. Empty or blank input maps to the given
/// placeholder (e.g. "Someone").
///
/// Operates on Unicode codepoints, so multi-byte names never split mid-char.
///
/// # Examples
///
/// ```
/// use proofpop::redact::redact;
///
/// assert_eq!(redact("Jo", "Someone"), "J*");
/// assert_eq!(redact("Alexander", "Someone"), "Al*******");
/// assert_eq!(redact("", "Someone"), "Someone");
/// ```
pub fn redact(name: &str, placeholder: &str) -> String {
    if name.trim().is_empty() {
        return placeholder.to_string();
    }

    name.split_whitespace()
        .map(redact_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn redact_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= 2 {
        let mut out = String::new();
        out.push(chars[0]);
        out.push('*');
        out
    } else {
        let mut out: String = chars[..2].iter().collect();
        out.extend(std::iter::repeat('*').take(chars.len() - 2));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_word_keeps_first_char() {
        assert_eq!(redact("Jo", "Someone"), "J*");
        assert_eq!(redact("A", "Someone"), "A*");
    }

    #[test]
    fn long_word_keeps_two_chars() {
        assert_eq!(redact("Alexander", "Someone"), "Al*******");
        assert_eq!(redact("Ana", "Someone"), "An*");
    }

    #[test]
    fn empty_input_uses_placeholder() {
        assert_eq!(redact("", "Someone"), "Someone");
        assert_eq!(redact("   ", "Someone"), "Someone");
        assert_eq!(redact("", "Seseorang"), "Seseorang");
    }

    #[test]
    fn multi_word_names_redact_independently() {
        assert_eq!(redact("Jo Alexander", "Someone"), "J* Al*******");
        // Runs of whitespace collapse to single spaces
        assert_eq!(redact("Jo   Alexander", "Someone"), "J* Al*******");
    }

    #[test]
    fn multibyte_names_do_not_panic() {
        assert_eq!(redact("Émile", "Someone"), "Ém***");
        assert_eq!(redact("李", "Someone"), "李*");
    }
}
