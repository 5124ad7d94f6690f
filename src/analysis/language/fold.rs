//! Explicit code point folding for the Unicode tokenizer tier.
//!
//! Case folding and diacritic stripping are a match over known ranges
//! (Latin-1, Latin Extended-A, the Vietnamese letters of Latin Extended-B,
//! Latin Extended Additional, Greek and Cyrillic). Code points outside these
//! ranges pass through unchanged.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Term(char),
    /// Combining mark: part of the current token, dropped when stripping.
    Mark(char),
    Delimiter,
}

pub fn classify(ch: char, lowercase: bool, strip: bool) -> CharClass {
    let cp = ch as u32;
    if (0x0300..=0x036F).contains(&cp) {
        return CharClass::Mark(ch);
    }
    if !ch.is_alphanumeric() {
        return CharClass::Delimiter;
    }
    let lower = to_lower(ch);
    let folded = match (lowercase, strip) {
        (true, true) => strip_diacritic(lower),
        (true, false) => lower,
        (false, true) => restore_case(ch, lower, strip_diacritic(lower)),
        (false, false) => ch,
    };
    CharClass::Term(folded)
}

fn restore_case(original: char, lower: char, stripped: char) -> char {
    if original != lower && stripped.is_ascii() {
        stripped.to_ascii_uppercase()
    } else if original != lower {
        original
    } else {
        stripped
    }
}

pub fn to_lower(ch: char) -> char {
    let cp = ch as u32;
    let lowered = match cp {
        0x41..=0x5A => cp + 0x20,
        0xC0..=0xDE if cp != 0xD7 => cp + 0x20,
        // Latin Extended-A: alternating upper/lower pairs
        0x100..=0x137 | 0x14A..=0x177 if cp % 2 == 0 => cp + 1,
        0x139..=0x148 | 0x179..=0x17E if cp % 2 == 1 => cp + 1,
        0x178 => 0xFF,
        // Vietnamese horn letters
        0x1A0 | 0x1AF => cp + 1,
        // Latin Extended Additional
        0x1E00..=0x1E95 | 0x1EA0..=0x1EFF if cp % 2 == 0 => cp + 1,
        0x1E9E => 0xDF,
        // Greek
        0x386 => 0x3AC,
        0x388..=0x38A => cp + 0x25,
        0x38C => 0x3CC,
        0x38E | 0x38F => cp + 0x3F,
        0x391..=0x3A9 if cp != 0x3A2 => cp + 0x20,
        // Cyrillic
        0x400..=0x40F => cp + 0x50,
        0x410..=0x42F => cp + 0x20,
        0x460..=0x481 | 0x48A..=0x4BF if cp % 2 == 0 => cp + 1,
        _ => cp,
    };
    char::from_u32(lowered).unwrap_or(ch)
}

/// Map a lowercase letter to its base letter.
pub fn strip_diacritic(ch: char) -> char {
    let cp = ch as u32;
    let base = match cp {
        0xE0..=0xE5 => 'a' as u32,
        0xE7 => 'c' as u32,
        0xE8..=0xEB => 'e' as u32,
        0xEC..=0xEF => 'i' as u32,
        0xF1 => 'n' as u32,
        0xF2..=0xF6 | 0xF8 => 'o' as u32,
        0xF9..=0xFC => 'u' as u32,
        0xFD | 0xFF => 'y' as u32,
        0x100..=0x105 => 'a' as u32,
        0x106..=0x10D => 'c' as u32,
        0x10E..=0x111 => 'd' as u32,
        0x112..=0x11B => 'e' as u32,
        0x11C..=0x123 => 'g' as u32,
        0x124..=0x127 => 'h' as u32,
        0x128..=0x131 => 'i' as u32,
        0x134..=0x135 => 'j' as u32,
        0x136..=0x138 => 'k' as u32,
        0x139..=0x142 => 'l' as u32,
        0x143..=0x14B => 'n' as u32,
        0x14C..=0x151 => 'o' as u32,
        0x154..=0x159 => 'r' as u32,
        0x15A..=0x161 => 's' as u32,
        0x162..=0x167 => 't' as u32,
        0x168..=0x173 => 'u' as u32,
        0x174..=0x175 => 'w' as u32,
        0x176..=0x178 => 'y' as u32,
        0x179..=0x17E => 'z' as u32,
        0x1A0..=0x1A1 => 'o' as u32,
        0x1AF..=0x1B0 => 'u' as u32,
        // Vietnamese tone-marked vowels
        0x1EA0..=0x1EB7 => 'a' as u32,
        0x1EB8..=0x1EC7 => 'e' as u32,
        0x1EC8..=0x1ECB => 'i' as u32,
        0x1ECC..=0x1EE3 => 'o' as u32,
        0x1EE4..=0x1EF1 => 'u' as u32,
        0x1EF2..=0x1EF9 => 'y' as u32,
        // Greek tonos and dialytika
        0x3AC => 0x3B1,
        0x3AD => 0x3B5,
        0x3AE => 0x3B7,
        0x3AF | 0x3CA | 0x390 => 0x3B9,
        0x3CC => 0x3BF,
        0x3CD | 0x3CB | 0x3B0 => 0x3C5,
        0x3CE => 0x3C9,
        // Cyrillic yo and short i
        0x451 => 0x435,
        0x439 => 0x438,
        _ => cp,
    };
    char::from_u32(base).unwrap_or(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_latin_and_vietnamese() {
        assert_eq!(to_lower('É'), 'é');
        assert_eq!(to_lower('Ệ'), 'ệ');
        assert_eq!(to_lower('Đ'), 'đ');
        assert_eq!(to_lower('Ư'), 'ư');
        assert_eq!(strip_diacritic('ệ'), 'e');
        assert_eq!(strip_diacritic('đ'), 'd');
        assert_eq!(strip_diacritic('ư'), 'u');
        assert_eq!(strip_diacritic('ñ'), 'n');
    }

    #[test]
    fn folds_greek_and_cyrillic() {
        assert_eq!(to_lower('Ω'), 'ω');
        assert_eq!(to_lower('Ж'), 'ж');
        assert_eq!(to_lower('Ё'), 'ё');
        assert_eq!(strip_diacritic('ά'), 'α');
        assert_eq!(strip_diacritic('ё'), 'е');
    }

    #[test]
    fn classifies_marks_and_delimiters() {
        assert_eq!(classify('\u{0301}', true, true), CharClass::Mark('\u{0301}'));
        assert_eq!(classify('—', true, true), CharClass::Delimiter);
        assert_eq!(classify('Ế', true, true), CharClass::Term('e'));
        assert_eq!(classify('Ế', false, true), CharClass::Term('E'));
        assert_eq!(classify('日', true, true), CharClass::Term('日'));
    }
}
