//! Offset-preserving text normalization.
//!
//! Normalization rules, applied in order:
//! - Zero-width and directional control characters are dropped.
//! - Non-breaking space variants fold to a regular space.
//! - Interior whitespace runs collapse to one space; leading and trailing
//!   whitespace is dropped.
//! - `".."` (not part of a longer dot run) collapses to `"."`, `", ,"` to
//!   `", "`, `",,"` to `","`.
//!
//! Every output character carries the char index of the input character it
//! came from, so a match in normalized text can be traced back to the raw
//! text. The punctuation collapses are repeated until nothing changes, which
//! makes the function idempotent.
//!
//! Example:
//!   "Art.  5\u{a0}\u{200b} bis.." → "Art. 5 bis."

use serde::{Deserialize, Serialize};

/// Characters removed outright.
pub const ZERO_WIDTH_CHARACTERS: [char; 10] = [
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{200E}', // left-to-right mark
    '\u{200F}', // right-to-left mark
    '\u{202A}', // left-to-right embedding
    '\u{202C}', // pop directional formatting
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte order mark
    '\u{00AD}', // soft hyphen
];

/// Characters folded to `' '`.
pub const NON_BREAKING_SPACES: [char; 3] = [
    '\u{00A0}', // non-breaking space
    '\u{202F}', // narrow no-break space
    '\u{2007}', // figure space
];

/// Normalized text plus, for every char of `text`, the char index in the
/// input it maps to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalized {
    pub text: String,
    pub offsets: Vec<usize>,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Normalize `raw`, keeping a char-level offset map back into it.
pub fn normalize(raw: &str) -> Normalized {
    if raw.is_empty() {
        return Normalized::default();
    }

    let mut chars = Vec::new();
    let mut offsets = Vec::new();
    fold_whitespace(raw, &mut chars, &mut offsets);

    loop {
        let before = chars.len();
        collapse_double_dots(&mut chars, &mut offsets);
        collapse_comma_space_comma(&mut chars, &mut offsets);
        collapse_double_commas(&mut chars, &mut offsets);
        squeeze_spaces(&mut chars, &mut offsets);
        if chars.len() == before {
            break;
        }
    }

    Normalized {
        text: chars.into_iter().collect(),
        offsets,
    }
}

/// Plain normalized text, for callers that do not need offsets.
pub fn normalize_text(raw: &str) -> String {
    normalize(raw).text
}

pub fn is_zero_width(ch: char) -> bool {
    ZERO_WIDTH_CHARACTERS.contains(&ch)
}

pub fn is_non_breaking_space(ch: char) -> bool {
    NON_BREAKING_SPACES.contains(&ch)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Drop invisible characters, fold non-breaking spaces and collapse
/// whitespace runs. Interior runs become one space mapped to the run's first
/// whitespace character.
fn fold_whitespace(raw: &str, chars: &mut Vec<char>, offsets: &mut Vec<usize>) {
    let input: Vec<char> = raw.chars().collect();
    let len = input.len();
    let mut seen_non_space = false;
    let mut i = 0;

    while i < len {
        let ch = fold_space(input[i]);
        if is_zero_width(ch) {
            i += 1;
            continue;
        }
        if ch.is_whitespace() {
            let ws_start = i;
            i += 1;
            while i < len {
                let next = fold_space(input[i]);
                if !is_zero_width(next) && !next.is_whitespace() {
                    break;
                }
                i += 1;
            }
            if seen_non_space && i < len {
                chars.push(' ');
                offsets.push(ws_start);
            }
            continue;
        }
        chars.push(ch);
        offsets.push(i);
        seen_non_space = true;
        i += 1;
    }

    if chars.last() == Some(&' ') {
        chars.pop();
        offsets.pop();
    }
}

fn fold_space(ch: char) -> char {
    if is_non_breaking_space(ch) {
        ' '
    } else {
        ch
    }
}

/// Keep chars whose index satisfies `keep`, preserving the offset pairing.
fn retain_indexed(chars: &mut Vec<char>, offsets: &mut Vec<usize>, keep: &[bool]) {
    let mut idx = 0;
    chars.retain(|_| {
        idx += 1;
        keep[idx - 1]
    });
    let mut idx = 0;
    offsets.retain(|_| {
        idx += 1;
        keep[idx - 1]
    });
}

/// `..` not adjacent to a third dot → `.`
fn collapse_double_dots(chars: &mut Vec<char>, offsets: &mut Vec<usize>) {
    let len = chars.len();
    let mut keep = vec![true; len];
    let mut i = 0;
    while i < len {
        if chars[i] == '.'
            && i + 1 < len
            && chars[i + 1] == '.'
            && (i == 0 || chars[i - 1] != '.')
            && (i + 2 >= len || chars[i + 2] != '.')
        {
            keep[i + 1] = false;
            i += 2;
            continue;
        }
        i += 1;
    }
    retain_indexed(chars, offsets, &keep);
}

/// `, ,` → `, `
fn collapse_comma_space_comma(chars: &mut Vec<char>, offsets: &mut Vec<usize>) {
    let len = chars.len();
    let mut keep = vec![true; len];
    let mut i = 0;
    while i < len {
        if chars[i] == ',' && i + 2 < len && chars[i + 1] == ' ' && chars[i + 2] == ',' {
            keep[i + 2] = false;
            i += 3;
            continue;
        }
        i += 1;
    }
    retain_indexed(chars, offsets, &keep);
}

/// `,,` → `,`
fn collapse_double_commas(chars: &mut Vec<char>, offsets: &mut Vec<usize>) {
    let len = chars.len();
    let mut keep = vec![true; len];
    let mut i = 0;
    while i < len {
        if chars[i] == ',' && i + 1 < len && chars[i + 1] == ',' {
            keep[i + 1] = false;
            i += 2;
            continue;
        }
        i += 1;
    }
    retain_indexed(chars, offsets, &keep);
}

/// Punctuation collapses can leave two spaces side by side (`"a, , b"`);
/// keep the first. Also re-trims the ends.
fn squeeze_spaces(chars: &mut Vec<char>, offsets: &mut Vec<usize>) {
    let len = chars.len();
    let mut keep = vec![true; len];
    for i in 1..len {
        if chars[i] == ' ' && chars[i - 1] == ' ' {
            keep[i] = false;
        }
    }
    if let Some(first) = keep.first_mut() {
        if chars[0] == ' ' {
            *first = false;
        }
    }
    if len > 0 && chars[len - 1] == ' ' {
        keep[len - 1] = false;
    }
    retain_indexed(chars, offsets, &keep);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mixed_invisible_and_punctuation() {
        let n = normalize("Art.  5\u{a0}\u{200b} bis..");
        assert_eq!(n.text, "Art. 5 bis.");
        assert_eq!(n.offsets.len(), n.text.chars().count());
    }

    #[test]
    fn empty_input() {
        let n = normalize("");
        assert!(n.is_empty());
        assert_eq!(n.text, "");
    }

    #[test]
    fn only_whitespace_and_invisible() {
        assert!(normalize(" \u{200b}\t\u{a0}\n\u{feff} ").is_empty());
    }

    #[test]
    fn leading_and_trailing_whitespace_dropped() {
        let n = normalize("  abc  ");
        assert_eq!(n.text, "abc");
        assert_eq!(n.offsets, vec![2, 3, 4]);
    }

    #[test]
    fn interior_space_maps_to_first_whitespace() {
        let n = normalize("multa \u{a0}\t de");
        assert_eq!(n.text, "multa de");
        assert_eq!(n.offsets[5], 5);
        assert_eq!(n.offsets[6], 9);
    }

    #[test]
    fn zero_width_inside_word_is_dropped_not_mapped() {
        let n = normalize("con\u{200b}trato");
        assert_eq!(n.text, "contrato");
        assert_eq!(n.offsets, vec![0, 1, 2, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn double_dot_keeps_first_offset() {
        let n = normalize("fim..");
        assert_eq!(n.text, "fim.");
        assert_eq!(n.offsets[3], 3);
    }

    #[test]
    fn ellipsis_is_preserved() {
        assert_eq!(normalize_text("e assim..."), "e assim...");
    }

    #[test]
    fn comma_collapses() {
        assert_eq!(normalize_text("a,,b"), "a,b");
        assert_eq!(normalize_text("a, ,b"), "a, b");
        assert_eq!(normalize_text("a, , b"), "a, b");
        assert_eq!(normalize_text("a,,,b"), "a,b");
    }

    #[test]
    fn soft_hyphen_removed() {
        assert_eq!(normalize_text("contra\u{ad}tante"), "contratante");
    }

    #[test]
    fn offsets_are_char_indices() {
        let n = normalize("é  ç");
        assert_eq!(n.text, "é ç");
        assert_eq!(n.offsets, vec![0, 1, 3]);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(s in "[a-c .,\u{a0}\u{200b}\t\n]{0,40}") {
            let once = normalize(&s).text;
            let twice = normalize(&once).text;
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn offsets_are_monotone_and_in_bounds(s in "[a-c .,\u{a0}\u{200b}\t\n]{0,40}") {
            let n = normalize(&s);
            let input: Vec<char> = s.chars().collect();
            prop_assert_eq!(n.offsets.len(), n.text.chars().count());
            for pair in n.offsets.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for (ch, &off) in n.text.chars().zip(&n.offsets) {
                prop_assert!(off < input.len());
                let src = input[off];
                if ch == ' ' {
                    prop_assert!(src.is_whitespace() || is_non_breaking_space(src));
                } else {
                    prop_assert_eq!(ch, src);
                }
            }
        }
    }
}
