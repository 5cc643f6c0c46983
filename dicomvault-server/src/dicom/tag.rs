//! Field coordinates
//!
//! A field inside a DICOM record is addressed by a (group, element) pair of
//! 16-bit values written as four hex digits each, e.g. `(0010,0010)`.

use std::fmt;
use std::str::FromStr;

use dicom_core::Tag;

/// Typed (group, element) field coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagCoordinate {
    pub group: u16,
    pub element: u16,
}

/// Reason a coordinate token was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagParseError {
    #[error("expected exactly two comma-separated parts")]
    WrongPartCount,

    #[error("empty coordinate part")]
    EmptyPart,

    #[error("coordinate part is not a 16-bit hex number: {0}")]
    NotHex(String),
}

impl TagCoordinate {
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }

    /// Parse a request token such as `(0010,0010)` or `0010,0010`
    ///
    /// Grouping parentheses are stripped wherever they occur, the remainder
    /// must split on `,` into exactly two non-empty hex parts.
    pub fn parse_token(token: &str) -> Result<Self, TagParseError> {
        let stripped: String = token.chars().filter(|c| *c != '(' && *c != ')').collect();

        let parts: Vec<&str> = stripped.split(',').map(str::trim).collect();
        let [group, element] = parts.as_slice() else {
            return Err(TagParseError::WrongPartCount);
        };

        Ok(Self {
            group: parse_hex_part(group)?,
            element: parse_hex_part(element)?,
        })
    }
}

fn parse_hex_part(part: &str) -> Result<u16, TagParseError> {
    if part.is_empty() {
        return Err(TagParseError::EmptyPart);
    }
    let digits = part
        .strip_prefix("0x")
        .or_else(|| part.strip_prefix("0X"))
        .unwrap_or(part);
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TagParseError::NotHex(part.to_string()));
    }
    u16::from_str_radix(digits, 16).map_err(|_| TagParseError::NotHex(part.to_string()))
}

impl FromStr for TagCoordinate {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_token(s)
    }
}

impl fmt::Display for TagCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

impl From<TagCoordinate> for Tag {
    fn from(coordinate: TagCoordinate) -> Self {
        Tag(coordinate.group, coordinate.element)
    }
}

impl From<Tag> for TagCoordinate {
    fn from(tag: Tag) -> Self {
        Self::new(tag.0, tag.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parenthesized_token() {
        let tag = TagCoordinate::parse_token("(0010,0010)").unwrap();
        assert_eq!(tag, TagCoordinate::new(0x0010, 0x0010));
    }

    #[test]
    fn test_parse_bare_and_lowercase_tokens() {
        assert_eq!(
            TagCoordinate::parse_token("7fe0,0010").unwrap(),
            TagCoordinate::new(0x7FE0, 0x0010)
        );
        assert_eq!(
            "(0028, 0011)".parse::<TagCoordinate>().unwrap(),
            TagCoordinate::new(0x0028, 0x0011)
        );
    }

    #[test]
    fn test_token_without_separator_is_rejected() {
        assert_eq!(
            TagCoordinate::parse_token("bogus"),
            Err(TagParseError::WrongPartCount)
        );
    }

    #[test]
    fn test_token_with_three_parts_is_rejected() {
        assert_eq!(
            TagCoordinate::parse_token("(0010,0010,0001)"),
            Err(TagParseError::WrongPartCount)
        );
    }

    #[test]
    fn test_token_with_empty_part_is_rejected() {
        assert_eq!(TagCoordinate::parse_token("(0010,)"), Err(TagParseError::EmptyPart));
        assert_eq!(TagCoordinate::parse_token("(,0010)"), Err(TagParseError::EmptyPart));
        assert_eq!(TagCoordinate::parse_token("()"), Err(TagParseError::WrongPartCount));
    }

    #[test]
    fn test_non_hex_part_is_rejected() {
        assert!(matches!(
            TagCoordinate::parse_token("(00G0,0010)"),
            Err(TagParseError::NotHex(_))
        ));
        assert!(matches!(
            TagCoordinate::parse_token("(10000,0010)"),
            Err(TagParseError::NotHex(_))
        ));
    }

    #[test]
    fn test_display_matches_dicom_notation() {
        assert_eq!(TagCoordinate::new(0x7FE0, 0x10).to_string(), "(7FE0,0010)");
    }

    #[test]
    fn test_conversion_to_dicom_tag() {
        let tag: Tag = TagCoordinate::new(0x0008, 0x0060).into();
        assert_eq!(tag, Tag(0x0008, 0x0060));
    }
}
