/// Data model shared by the fetch and persist stages.
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bytes::Bytes;

use crate::errors::{UnknownImageSize, WriteError};

/// Size class of a cover image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageSize {
    Default,
    Small,
    Large,
    XLarge,
}

impl ImageSize {
    pub const ALL: [ImageSize; 4] = [
        ImageSize::Default,
        ImageSize::Small,
        ImageSize::Large,
        ImageSize::XLarge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Default => "default",
            ImageSize::Small => "small",
            ImageSize::Large => "large",
            ImageSize::XLarge => "xlarge",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = UnknownImageSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownImageSize(s.to_string()))
    }
}

/// Raw bytes of a successfully retrieved variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Bytes);

impl Payload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Remote address of each variant, keyed by variant.
pub type Locators<K> = BTreeMap<K, String>;

/// Payloads of the variants whose retrieval succeeded.
pub type FetchResult<K> = BTreeMap<K, Payload>;

/// Outcome of a persist stage.
///
/// Both lists are ordered by variant key.
#[derive(Debug, Default)]
pub struct Report {
    /// Files written successfully.
    pub written: Vec<PathBuf>,
    /// Causes of every failed write.
    pub failures: Vec<WriteError>,
}

impl Report {
    /// Whether any write failed.
    pub fn any_failure(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}
