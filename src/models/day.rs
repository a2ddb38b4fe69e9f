//! Canonical weekday labels used as the join key for availability matching.
//!
//! Day values arrive from imported timetables in every spelling users manage
//! to produce ("Miércoles", "miercoles", "MIE", …). All comparisons go through
//! [`CanonicalDay::parse`], which folds case and diacritics and maps common
//! 3-letter abbreviations onto one of the five school-week labels. Anything
//! unrecognized parses to `None` and matches nothing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the five canonical school-week labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalDay {
    Lunes,
    Martes,
    Miercoles,
    Jueves,
    Viernes,
}

impl CanonicalDay {
    /// All five days, in week order.
    pub const ALL: [CanonicalDay; 5] = [
        CanonicalDay::Lunes,
        CanonicalDay::Martes,
        CanonicalDay::Miercoles,
        CanonicalDay::Jueves,
        CanonicalDay::Viernes,
    ];

    /// The canonical display label.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalDay::Lunes => "Lunes",
            CanonicalDay::Martes => "Martes",
            CanonicalDay::Miercoles => "Miercoles",
            CanonicalDay::Jueves => "Jueves",
            CanonicalDay::Viernes => "Viernes",
        }
    }

    /// Parse a free-form day name or abbreviation.
    ///
    /// Strips diacritical marks, lowercases, then looks the result up in a
    /// fixed table of full names and 3-letter abbreviations. Unknown or empty
    /// input yields `None`. Idempotent: `parse(d.label()) == Some(d)` for
    /// every canonical day.
    pub fn parse(raw: &str) -> Option<CanonicalDay> {
        let normalized = fold_diacritics(raw);
        match normalized.as_str() {
            "lunes" | "lun" => Some(CanonicalDay::Lunes),
            "martes" | "mar" => Some(CanonicalDay::Martes),
            "miercoles" | "mie" => Some(CanonicalDay::Miercoles),
            "jueves" | "jue" => Some(CanonicalDay::Jueves),
            "viernes" | "vie" => Some(CanonicalDay::Viernes),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercase and strip the accent marks that occur in Spanish day names.
///
/// Equivalent to Unicode canonical decomposition followed by removal of
/// combining marks, restricted to the characters day input actually
/// contains. Precomposed vowels map to their base letter; stray combining
/// marks (input already in NFD) are dropped.
fn fold_diacritics(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => out.push('a'),
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => out.push('e'),
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => out.push('i'),
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => out.push('o'),
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => out.push('u'),
            'ñ' | 'Ñ' => out.push('n'),
            '\u{0300}'..='\u{036f}' => {}
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_names() {
        assert_eq!(CanonicalDay::parse("lunes"), Some(CanonicalDay::Lunes));
        assert_eq!(CanonicalDay::parse("Martes"), Some(CanonicalDay::Martes));
        assert_eq!(CanonicalDay::parse("JUEVES"), Some(CanonicalDay::Jueves));
        assert_eq!(CanonicalDay::parse("viernes"), Some(CanonicalDay::Viernes));
    }

    #[test]
    fn test_parse_abbreviations() {
        assert_eq!(CanonicalDay::parse("lun"), Some(CanonicalDay::Lunes));
        assert_eq!(CanonicalDay::parse("mar"), Some(CanonicalDay::Martes));
        assert_eq!(CanonicalDay::parse("mie"), Some(CanonicalDay::Miercoles));
        assert_eq!(CanonicalDay::parse("jue"), Some(CanonicalDay::Jueves));
        assert_eq!(CanonicalDay::parse("vie"), Some(CanonicalDay::Viernes));
    }

    #[test]
    fn test_parse_is_diacritic_and_case_insensitive() {
        assert_eq!(
            CanonicalDay::parse("MIÉRCOLES"),
            Some(CanonicalDay::Miercoles)
        );
        assert_eq!(
            CanonicalDay::parse("miércoles"),
            CanonicalDay::parse("miercoles")
        );
        assert_eq!(CanonicalDay::parse("miércoles"), CanonicalDay::parse("mie"));
    }

    #[test]
    fn test_parse_decomposed_input() {
        // "mié" typed as 'e' + combining acute
        assert_eq!(
            CanonicalDay::parse("mie\u{0301}rcoles"),
            Some(CanonicalDay::Miercoles)
        );
    }

    #[test]
    fn test_weekend_and_garbage_rejected() {
        assert_eq!(CanonicalDay::parse("Sunday"), None);
        assert_eq!(CanonicalDay::parse("sabado"), None);
        assert_eq!(CanonicalDay::parse("domingo"), None);
        assert_eq!(CanonicalDay::parse(""), None);
        assert_eq!(CanonicalDay::parse("  "), None);
    }

    #[test]
    fn test_labels_round_trip() {
        for day in CanonicalDay::ALL {
            assert_eq!(CanonicalDay::parse(day.label()), Some(day));
        }
    }
}
