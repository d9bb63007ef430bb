//! Semantic version codec
//!
//! Redis modules report their version as a single integer in which each of
//! major, minor and patch takes a two-digit decimal field:
//! `major * 10000 + minor * 100 + patch`. Integer comparison of two encoded
//! versions matches lexicographic `(major, minor, patch)` comparison as long
//! as every component stays within `0..=99`.

use crate::errors::FormatError;
use std::fmt;
use std::str::FromStr;

/// Marker character prefixed to rendered versions
pub const VERSION_MARKER: char = 'v';

/// Largest value a single component may take
pub const MAX_COMPONENT: u32 = 99;

/// Largest encoded value whose fields all decode losslessly
pub const MAX_ENCODED: u32 = 999_999;

const FIELD: u32 = 100;

/// A three-component version with every component in `0..=99`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    /// Create a version, rejecting components that would collide when encoded
    pub fn new(major: u32, minor: u32, patch: u32) -> Result<Self, FormatError> {
        let check = |value: u32| {
            if value > MAX_COMPONENT {
                Err(FormatError::OutOfRange {
                    input: format!("{}{}.{}.{}", VERSION_MARKER, major, minor, patch),
                    value,
                    max: MAX_COMPONENT,
                })
            } else {
                Ok(value as u8)
            }
        };

        Ok(Self {
            major: check(major)?,
            minor: check(minor)?,
            patch: check(patch)?,
        })
    }

    /// Single comparable integer form
    pub fn encoded(&self) -> u32 {
        (self.major as u32 * FIELD + self.minor as u32) * FIELD + self.patch as u32
    }

    /// Split an encoded integer into its three two-digit fields.
    ///
    /// Digits above the major field are discarded, so values beyond
    /// [`MAX_ENCODED`] come back as a plausible but wrong version.
    pub fn from_encoded(value: u32) -> Self {
        let mut rest = value;
        let mut fields = [0u8; 3];
        for field in fields.iter_mut().rev() {
            *field = (rest % FIELD) as u8;
            rest /= FIELD;
        }

        Self {
            major: fields[0],
            minor: fields[1],
            patch: fields[2],
        }
    }
}

impl FromStr for Version {
    type Err = FormatError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let body = match input.chars().next() {
            Some(c) if !c.is_ascii_digit() => &input[c.len_utf8()..],
            _ => input,
        };

        let components: Vec<&str> = body.split('.').collect();
        if components.len() != 3 {
            return Err(FormatError::ComponentCount {
                input: input.to_string(),
                found: components.len(),
            });
        }

        let mut values = [0u32; 3];
        for (slot, component) in values.iter_mut().zip(&components) {
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FormatError::NonNumeric {
                    input: input.to_string(),
                    component: component.to_string(),
                });
            }
            // Anything longer than u32 can hold is out of range anyway
            *slot = component.parse().unwrap_or(u32::MAX);
            if *slot > MAX_COMPONENT {
                return Err(FormatError::OutOfRange {
                    input: input.to_string(),
                    value: *slot,
                    max: MAX_COMPONENT,
                });
            }
        }

        Version::new(values[0], values[1], values[2])
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}.{}", VERSION_MARKER, self.major, self.minor, self.patch)
    }
}

/// Encode a version string such as `v1.0.2` into its integer form
pub fn encode(version: &str) -> Result<u32, FormatError> {
    version.parse::<Version>().map(|v| v.encoded())
}

/// Render an encoded integer as a marker-prefixed version string
pub fn decode(value: u32) -> String {
    Version::from_encoded(value).to_string()
}
