/// Target URI validation.
///
/// Accepts `spotify:track:<id>` and `spotify:album:<id>` where the id is a
/// base-62 number, and converts that id into the hex form the metadata
/// service addresses items by.
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use coverfetch_shared::TargetError;

/// Kind of item a target URI points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Single item.
    Track,
    /// Collection item.
    Album,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Track => "track",
            TargetKind::Album => "album",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated target URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUri {
    pub kind: TargetKind,
    /// Base-62 id as it appears in the URI.
    pub id: String,
}

// ====== REGEX PATTERNS ======

static TARGET_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^spotify:(track|album):([a-zA-Z0-9]+)$").unwrap()
});

const BASE62_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

impl TargetUri {
    /// Validate and split a target URI.
    pub fn parse(uri: &str) -> Result<Self, TargetError> {
        let cap = TARGET_URI_RE
            .captures(uri)
            .ok_or_else(|| TargetError::Malformed(uri.to_string()))?;

        let kind = match &cap[1] {
            "track" => TargetKind::Track,
            _ => TargetKind::Album,
        };

        Ok(Self {
            kind,
            id: cap[2].to_string(),
        })
    }

    /// The id as a 32-digit lower-case hex string.
    pub fn hex_id(&self) -> Result<String, TargetError> {
        base62_to_hex(&self.id)
    }
}

impl FromStr for TargetUri {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetUri::parse(s)
    }
}

impl fmt::Display for TargetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spotify:{}:{}", self.kind, self.id)
    }
}

/// Convert a base-62 id into its 128-bit hex rendering.
pub fn base62_to_hex(id: &str) -> Result<String, TargetError> {
    let mut value: u128 = 0;
    for byte in id.bytes() {
        let digit = BASE62_ALPHABET
            .iter()
            .position(|c| *c == byte)
            .ok_or_else(|| TargetError::Malformed(id.to_string()))?;
        value = value
            .checked_mul(62)
            .and_then(|v| v.checked_add(digit as u128))
            .ok_or_else(|| TargetError::IdOverflow(id.to_string()))?;
    }
    Ok(format!("{:032x}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_uri() {
        let target = TargetUri::parse("spotify:track:6rqhFgbbKwnb9MLmUQDhG6").unwrap();
        assert_eq!(target.kind, TargetKind::Track);
        assert_eq!(target.id, "6rqhFgbbKwnb9MLmUQDhG6");
    }

    #[test]
    fn test_album_uri() {
        let target: TargetUri = "spotify:album:4uLU6hMCjMI75M1A2tKUQC".parse().unwrap();
        assert_eq!(target.kind, TargetKind::Album);
        assert_eq!(target.to_string(), "spotify:album:4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn test_malformed_uris() {
        for uri in [
            "",
            "spotify:artist:4uLU6hMCjMI75M1A2tKUQC",
            "spotify:album:",
            "spotify:album:abc-def",
            "https://open.spotify.com/album/4uLU6hMCjMI75M1A2tKUQC",
            " spotify:album:abc",
            "spotify:album:abc\n",
        ] {
            assert_eq!(
                TargetUri::parse(uri),
                Err(TargetError::Malformed(uri.to_string())),
                "{:?} should be rejected",
                uri
            );
        }
    }

    #[test]
    fn test_base62_to_hex() {
        assert_eq!(
            base62_to_hex("6rqhFgbbKwnb9MLmUQDhG6").unwrap(),
            "d3aca7e43e3b452cbfa9ddd2eab9497e"
        );
        assert_eq!(
            base62_to_hex("4uLU6hMCjMI75M1A2tKUQC").unwrap(),
            "93bc414a606747b2b612491ef83d5a3e"
        );
        assert_eq!(base62_to_hex("10").unwrap(), "0000000000000000000000000000003e");
    }

    #[test]
    fn test_base62_overflow() {
        let id = "Z".repeat(22);
        assert_eq!(base62_to_hex(&id), Err(TargetError::IdOverflow(id.clone())));
    }

    #[test]
    fn test_base62_rejects_foreign_digits() {
        assert_eq!(
            base62_to_hex("ab_c"),
            Err(TargetError::Malformed("ab_c".to_string()))
        );
    }
}
