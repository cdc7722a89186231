use crate::types::Pt;

/// The standard PDF fonts the engine renders with. They need no embedding,
/// so every section artifact stays small and merges without font clashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseFont {
    Helvetica,
    HelveticaBold,
    Courier,
}

impl BaseFont {
    pub const ALL: [BaseFont; 3] = [
        BaseFont::Helvetica,
        BaseFont::HelveticaBold,
        BaseFont::Courier,
    ];

    pub fn pdf_name(self) -> &'static str {
        match self {
            BaseFont::Helvetica => "Helvetica",
            BaseFont::HelveticaBold => "Helvetica-Bold",
            BaseFont::Courier => "Courier",
        }
    }

    pub fn resource_name(self) -> &'static str {
        match self {
            BaseFont::Helvetica => "F1",
            BaseFont::HelveticaBold => "F2",
            BaseFont::Courier => "F3",
        }
    }

    pub fn from_pdf_name(name: &str) -> Option<Self> {
        // Subset prefixes ("ABCDEF+Helvetica") are not produced by the
        // engine but show up if a section was post-processed elsewhere.
        let name = name.rsplit('+').next().unwrap_or(name);
        Self::ALL.into_iter().find(|f| f.pdf_name() == name)
    }

    /// Advance width of one character in 1/1000 em.
    pub fn advance(self, ch: char) -> u16 {
        match self {
            BaseFont::Courier => 600,
            BaseFont::Helvetica => ascii_width(&HELVETICA_WIDTHS, ch).unwrap_or(556),
            BaseFont::HelveticaBold => ascii_width(&HELVETICA_BOLD_WIDTHS, ch).unwrap_or(611),
        }
    }

    pub fn measure(self, size: Pt, text: &str) -> Pt {
        let units: u64 = text.chars().map(|ch| self.advance(ch) as u64).sum();
        Pt::from_f32(size.to_f32() * units as f32 / 1000.0)
    }
}

/// Default leading for a font size.
pub fn line_height(size: Pt) -> Pt {
    size.mul_ratio(6, 5)
}

fn ascii_width(table: &[u16; 95], ch: char) -> Option<u16> {
    let code = ch as u32;
    if (32..127).contains(&code) {
        Some(table[(code - 32) as usize])
    } else {
        None
    }
}

// AFM advance widths for codes 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths_match_afm() {
        assert_eq!(BaseFont::Helvetica.advance(' '), 278);
        assert_eq!(BaseFont::Helvetica.advance('W'), 944);
        assert_eq!(BaseFont::Helvetica.advance('i'), 222);
        assert_eq!(BaseFont::Helvetica.advance('~'), 584);
        assert_eq!(BaseFont::HelveticaBold.advance('m'), 889);
        assert_eq!(BaseFont::Courier.advance('i'), 600);
    }

    #[test]
    fn measure_scales_with_size() {
        let w = BaseFont::Courier.measure(Pt::from_f32(10.0), "abcd");
        assert_eq!(w.to_milli_i64(), 24_000);
        let h = BaseFont::Helvetica.measure(Pt::from_f32(10.0), "0");
        assert_eq!(h.to_milli_i64(), 5_560);
    }

    #[test]
    fn pdf_names_round_trip() {
        for font in BaseFont::ALL {
            assert_eq!(BaseFont::from_pdf_name(font.pdf_name()), Some(font));
        }
        assert_eq!(
            BaseFont::from_pdf_name("ABCDEF+Helvetica-Bold"),
            Some(BaseFont::HelveticaBold)
        );
        assert_eq!(BaseFont::from_pdf_name("Times-Roman"), None);
    }
}
