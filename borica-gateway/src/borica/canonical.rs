//! Canonical serialization of MAC source fields.
//!
//! The gateway signs (and expects us to verify) a deterministic byte string
//! built from an ordered list of protocol field values. Two encodings exist
//! across protocol generations and both must be supported:
//!
//! - **Length-prefixed**: each field contributes the decimal length of its
//!   UTF-8 byte representation immediately followed by the literal value.
//!   Absent fields contribute either a bare `0` or a single `-` placeholder,
//!   and some revisions terminate the whole string with a trailing `-`.
//! - **Plain**: fields joined with no separator (oldest revision).
//!
//! Canonicalization is pure and total: it never fails, for any input.

/// Representation of an empty field in the length-prefixed scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyField {
    /// Empty fields contribute a bare `0` (zero length, no value).
    ZeroLength,
    /// Empty fields are replaced by a single `-` placeholder.
    Dash,
}

/// Canonicalization scheme used for MAC source strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalScheme {
    /// Fields joined with no separator and no length prefixes.
    Plain,
    /// Length-prefixed concatenation, `{byte length}{value}` per field.
    LengthPrefixed {
        /// How absent fields are represented.
        empty: EmptyField,
        /// Whether a literal `-` terminates the whole string.
        trailing_dash: bool,
    },
}

impl CanonicalScheme {
    /// Serializes an ordered list of field values into the exact string the
    /// gateway signs.
    ///
    /// Length prefixes count UTF-8 bytes, not characters.
    #[must_use]
    pub fn canonicalize(&self, fields: &[&str]) -> String {
        match self {
            Self::Plain => fields.concat(),
            Self::LengthPrefixed { empty, trailing_dash } => {
                let mut out = String::new();
                for field in fields {
                    if field.is_empty() {
                        match empty {
                            EmptyField::ZeroLength => out.push('0'),
                            EmptyField::Dash => out.push('-'),
                        }
                    } else {
                        out.push_str(&field.len().to_string());
                        out.push_str(field);
                    }
                }
                if *trailing_dash {
                    out.push('-');
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIXED_DASH: CanonicalScheme =
        CanonicalScheme::LengthPrefixed { empty: EmptyField::Dash, trailing_dash: true };
    const PREFIXED_ZERO: CanonicalScheme =
        CanonicalScheme::LengthPrefixed { empty: EmptyField::ZeroLength, trailing_dash: false };

    #[test]
    fn test_plain_concatenation() {
        let scheme = CanonicalScheme::Plain;
        assert_eq!(scheme.canonicalize(&["V5400641", "1", "4999"]), "V540064114999");
        assert_eq!(scheme.canonicalize(&[]), "");
        assert_eq!(scheme.canonicalize(&["", "", ""]), "");
    }

    #[test]
    fn test_length_prefixed_basic() {
        assert_eq!(PREFIXED_ZERO.canonicalize(&["V5400641", "1"]), "8V540064111");
    }

    #[test]
    fn test_length_prefixed_empty_fields() {
        assert_eq!(PREFIXED_ZERO.canonicalize(&["A", "", "B"]), "1A01B");
        assert_eq!(PREFIXED_DASH.canonicalize(&["A", "", "B"]), "1A-1B-");
    }

    #[test]
    fn test_length_prefixed_trailing_dash() {
        assert_eq!(PREFIXED_DASH.canonicalize(&[]), "-");
        assert_eq!(PREFIXED_ZERO.canonicalize(&[]), "");
    }

    #[test]
    fn test_length_prefix_counts_utf8_bytes() {
        // Cyrillic text: 7 characters, 14 UTF-8 bytes
        let field = "Поръчка";
        assert_eq!(field.chars().count(), 7);
        assert_eq!(field.len(), 14);
        assert_eq!(PREFIXED_ZERO.canonicalize(&[field]), format!("14{field}"));
    }

    #[test]
    fn test_differing_splits_never_collide() {
        // Same total content, different field boundaries
        assert_ne!(
            PREFIXED_ZERO.canonicalize(&["49", "99"]),
            PREFIXED_ZERO.canonicalize(&["4999"])
        );
        assert_ne!(
            CanonicalScheme::Plain.canonicalize(&["a", "b"]).len(),
            PREFIXED_ZERO.canonicalize(&["a", "b"]).len()
        );
    }
}
