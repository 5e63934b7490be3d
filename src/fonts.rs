use lopdf::dictionary;
use unicode_normalization::UnicodeNormalization as _;

/// Advance widths of the printable ASCII range (`' '` to `'~'`) of Helvetica, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Advance widths of the printable ASCII range (`' '` to `'~'`) of Helvetica-Bold, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD_ASCII_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Characters of the WinAnsi encoding that live in the `0x80..=0x9F` block, which
/// unlike the rest of the encoding does not follow Latin-1.
const WIN_ANSI_SPECIALS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

const REPLACEMENT_CHARACTER: char = '?';

/// One of the standard PDF base fonts. These need no embedding, every PDF reader ships them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PostScript name written as `BaseFont`.
    pub fn base_font_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// The name under which the font is registered in the page resources.
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "F1",
            StandardFont::HelveticaBold => "F2",
        }
    }

    /// The PDF dictionary describing this font.
    pub fn to_dictionary(self) -> lopdf::Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font_name(),
            "Encoding" => "WinAnsiEncoding",
        }
    }

    /// Advance width of a single character in 1/1000 em.
    pub fn glyph_width(self, character: char) -> u16 {
        let ascii_widths = match self {
            StandardFont::Helvetica => &HELVETICA_ASCII_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_ASCII_WIDTHS,
        };
        let bold = self == StandardFont::HelveticaBold;

        if (' '..='~').contains(&character) {
            return ascii_widths[character as usize - 0x20];
        }

        match character {
            '\u{a0}' => 278,
            '€' | '–' | '«' | '»' => 556,
            '¡' => 333,
            '¿' => 611,
            '°' => 400,
            'ª' => 370,
            'º' => 365,
            '·' => 278,
            '•' => 350,
            '—' | '…' => 1000,
            '‘' | '’' => {
                if bold {
                    278
                } else {
                    222
                }
            }
            '“' | '”' => {
                if bold {
                    500
                } else {
                    333
                }
            }
            // Accented letters take the width of their base letter
            _ => match character.nfd().next() {
                Some(base) if base != character && (' '..='~').contains(&base) => {
                    ascii_widths[base as usize - 0x20]
                }
                _ => ascii_widths[REPLACEMENT_CHARACTER as usize - 0x20],
            },
        }
    }

    /// Width in points of `text` set at `font_size`.
    pub fn text_width(self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .nfc()
            .map(|character| match encode_character(character) {
                Some(_) => self.glyph_width(character) as u32,
                None => self.glyph_width(REPLACEMENT_CHARACTER) as u32,
            })
            .sum();

        units as f32 * font_size / 1000.0
    }
}

fn encode_character(character: char) -> Option<u8> {
    match character as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(character as u32 as u8),
        _ => WIN_ANSI_SPECIALS
            .iter()
            .find(|(special, _)| *special == character)
            .map(|(_, byte)| *byte),
    }
}

/// Encodes `text` in WinAnsi after normalizing it in the NFC form. Characters the
/// encoding cannot represent are replaced by `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.nfc()
        .map(|character| {
            encode_character(character).unwrap_or_else(|| {
                log::warn!(
                    "Unable to encode the character {:?} with the base fonts, replacing it",
                    character
                );
                REPLACEMENT_CHARACTER as u8
            })
        })
        .collect()
}
