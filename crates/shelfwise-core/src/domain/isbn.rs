use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const ISBN10_LEN: usize = 10;
const ISBN13_LEN: usize = 13;

/// Checksum-verified ISBN-10 or ISBN-13 with separators stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Parse and normalize an ISBN.
    ///
    /// Hyphens and spaces are ignored and a lowercase `x` check digit is
    /// uppercased, so `"0-8044-2957-x"` normalizes to `"080442957X"`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input
            .trim()
            .chars()
            .filter(|ch| *ch != '-' && *ch != ' ')
            .map(|ch| ch.to_ascii_uppercase())
            .collect::<String>();

        if normalized.is_empty() {
            return Err(ValidationError::EmptyIsbn);
        }

        let len = normalized.chars().count();
        for (index, ch) in normalized.chars().enumerate() {
            let check_x = ch == 'X' && index == len - 1 && len == ISBN10_LEN;
            if !(ch.is_ascii_digit() || check_x) {
                return Err(ValidationError::InvalidIsbnCharacter { ch, index });
            }
        }

        let expected = match len {
            ISBN10_LEN => isbn10_check_digit(&normalized),
            ISBN13_LEN => isbn13_check_digit(&normalized),
            _ => return Err(ValidationError::InvalidIsbnLength { len }),
        };

        let found = normalized.chars().last().unwrap_or_default();
        if found != expected {
            return Err(ValidationError::InvalidIsbnChecksum { expected, found });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_isbn13(&self) -> bool {
        self.0.len() == ISBN13_LEN
    }
}

fn digit_values(input: &str, take: usize) -> impl Iterator<Item = u32> + '_ {
    input.chars().take(take).filter_map(|ch| ch.to_digit(10))
}

fn isbn10_check_digit(input: &str) -> char {
    let sum: u32 = digit_values(input, 9)
        .zip((2..=10).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();
    match (11 - sum % 11) % 11 {
        10 => 'X',
        value => char::from_digit(value, 10).unwrap_or('0'),
    }
}

fn isbn13_check_digit(input: &str) -> char {
    let sum: u32 = digit_values(input, 12)
        .enumerate()
        .map(|(index, digit)| if index % 2 == 0 { digit } else { digit * 3 })
        .sum();
    char::from_digit((10 - sum % 10) % 10, 10).unwrap_or('0')
}

impl Display for Isbn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for Isbn {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Isbn {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Isbn> for String {
    fn from(value: Isbn) -> Self {
        value.0
    }
}
