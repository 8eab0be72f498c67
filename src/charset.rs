//! ASCII-safe text folding for the base-14 fallback fonts.
//!
//! The built-in Type1 fonts cover WinAnsi only, which lacks most Polish
//! diacritics. When no embeddable font is available, every rendered
//! string is folded through this fixed substitution table so the output
//! stays legible instead of degrading to replacement characters.

/// Diacritic-to-ASCII substitutions, lowercase and uppercase.
const ASCII_FOLD: [(char, char); 18] = [
    ('ą', 'a'),
    ('ć', 'c'),
    ('ę', 'e'),
    ('ł', 'l'),
    ('ń', 'n'),
    ('ó', 'o'),
    ('ś', 's'),
    ('ź', 'z'),
    ('ż', 'z'),
    ('Ą', 'A'),
    ('Ć', 'C'),
    ('Ę', 'E'),
    ('Ł', 'L'),
    ('Ń', 'N'),
    ('Ó', 'O'),
    ('Ś', 'S'),
    ('Ź', 'Z'),
    ('Ż', 'Z'),
];

pub fn ascii_fold(text: &str) -> String {
    text.chars()
        .map(|ch| {
            ASCII_FOLD
                .iter()
                .find(|(from, _)| *from == ch)
                .map(|(_, to)| *to)
                .unwrap_or(ch)
        })
        .collect()
}

/// Per-renderer text policy: pass through when the embedded font covers
/// the extended charset, fold otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Charset {
    extended: bool,
}

impl Charset {
    pub fn new(extended: bool) -> Self {
        Self { extended }
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn clean(&self, text: &str) -> String {
        if self.extended {
            text.to_string()
        } else {
            ascii_fold(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_all_eighteen_diacritics() {
        assert_eq!(ascii_fold("ąćęłńóśźż"), "acelnoszz");
        assert_eq!(ascii_fold("ĄĆĘŁŃÓŚŹŻ"), "ACELNOSZZ");
    }

    #[test]
    fn leaves_other_text_untouched() {
        assert_eq!(ascii_fold("Obwód / Opis 1,5 mm2"), "Obwod / Opis 1,5 mm2");
        assert_eq!(ascii_fold("PASS"), "PASS");
    }

    #[test]
    fn extended_charset_passes_through() {
        let extended = Charset::new(true);
        assert_eq!(extended.clean("Pętla (Zs)"), "Pętla (Zs)");
        let ascii = Charset::new(false);
        assert_eq!(ascii.clean("Pętla (Zs)"), "Petla (Zs)");
    }
}
