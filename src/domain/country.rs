//! Country codes and per-country totals.
//!
//! Codes are drawn from a closed set fixed at startup. [`KNOWN_COUNTRY_CODES`]
//! holds the built-in set of 195 sovereign states; deployments may configure
//! a different closed set (see [`crate::config::Config`]).

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string is not a two-letter ASCII country code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid country code '{0}': expected two ASCII letters")]
pub struct InvalidCountryCode(pub String);

/// A two-letter country identifier, stored lowercase.
///
/// `CountryCode` is `Copy` and hashes as two bytes, so it is cheap to use as a
/// map key on the vote hot path. Parsing accepts either case and normalizes to
/// lowercase:
///
/// ```
/// use vote_cache::domain::country::CountryCode;
///
/// let code = CountryCode::parse("TR").unwrap();
/// assert_eq!(code.as_str(), "tr");
/// assert!(CountryCode::parse("t1").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Parses a two-letter ASCII code, normalizing it to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCountryCode`] unless `code` is exactly two ASCII letters.
    pub fn parse(code: &str) -> Result<Self, InvalidCountryCode> {
        match code.as_bytes() {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Ok(Self([a.to_ascii_lowercase(), b.to_ascii_lowercase()]))
            }
            _ => Err(InvalidCountryCode(code.to_string())),
        }
    }

    /// Builds a code from a lowercase literal; panics at compile time when used
    /// in a const context with anything else.
    pub const fn from_static(code: &'static str) -> Self {
        let bytes = code.as_bytes();
        assert!(bytes.len() == 2, "country code must have two letters");
        assert!(
            bytes[0].is_ascii_lowercase() && bytes[1].is_ascii_lowercase(),
            "country code must be lowercase ASCII"
        );
        Self([bytes[0], bytes[1]])
    }

    /// Returns the code as a string slice, e.g. `"tr"`.
    pub fn as_str(&self) -> &str {
        // SAFETY: both constructors only admit ASCII letters, which are valid UTF-8.
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }
}

impl FromStr for CountryCode {
    type Err = InvalidCountryCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for CountryCode {
    type Error = InvalidCountryCode;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountryCode({})", self.as_str())
    }
}

impl Serialize for CountryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Aggregated total for one country as reported by durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountryTotal {
    pub code: CountryCode,
    pub total: i64,
}

impl CountryTotal {
    pub fn new(code: CountryCode, total: i64) -> Self {
        Self { code, total }
    }
}

const KNOWN_CODES_RAW: [&str; 195] = [
    "ad", "ae", "af", "ag", "al", "am", "ao", "ar", "at", "au", "az", "ba", "bb", "bd",
    "be", "bf", "bg", "bh", "bi", "bj", "bn", "bo", "br", "bs", "bt", "bw", "by", "bz",
    "ca", "cd", "cf", "cg", "ch", "ci", "cl", "cm", "cn", "co", "cr", "cu", "cv", "cy",
    "cz", "de", "dj", "dk", "dm", "do", "dz", "ec", "ee", "eg", "er", "es", "et", "fi",
    "fj", "fm", "fr", "ga", "gb", "gd", "ge", "gh", "gm", "gn", "gq", "gr", "gt", "gw",
    "gy", "hn", "hr", "ht", "hu", "id", "ie", "il", "in", "iq", "ir", "it", "jm", "jo",
    "jp", "ke", "kg", "kh", "ki", "km", "kn", "kp", "kr", "kw", "kz", "la", "lb", "lc",
    "li", "lk", "lr", "ls", "lt", "lu", "lv", "ly", "ma", "mc", "md", "me", "mg", "mh",
    "mk", "ml", "mm", "mn", "mr", "mt", "mu", "mv", "mw", "mx", "my", "mz", "na", "ne",
    "ng", "ni", "nl", "no", "np", "nr", "nz", "om", "pa", "pe", "pg", "ph", "pk", "pl",
    "ps", "pt", "pw", "py", "qa", "ro", "rs", "ru", "rw", "sa", "sb", "sc", "sd", "se",
    "sg", "si", "sk", "sl", "sm", "sn", "so", "sr", "ss", "st", "sv", "sy", "sz", "td",
    "tg", "th", "tj", "tl", "tm", "tn", "to", "tr", "tt", "tv", "tw", "tz", "ua", "ug",
    "us", "uy", "uz", "va", "vc", "ve", "vn", "vu", "ws", "ye", "za", "zm", "zw",
];

/// The built-in closed set of country codes, sorted alphabetically.
pub const KNOWN_COUNTRY_CODES: [CountryCode; 195] = {
    let mut codes = [CountryCode([b'a', b'a']); 195];
    let mut i = 0;
    while i < KNOWN_CODES_RAW.len() {
        codes[i] = CountryCode::from_static(KNOWN_CODES_RAW[i]);
        i += 1;
    }
    codes
};
