use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content hash used to recognise an already-alerted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    Sha256,
    Md5,
}

impl DigestAlgorithm {
    /// Lower-case hex digest of the UTF-8 bytes of `message`.
    pub fn digest(self, message: &str) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(message.as_bytes())),
            Self::Md5 => hex::encode(md5::compute(message.as_bytes()).0),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown digest algorithm '{0}'")]
pub struct UnknownDigest(pub String);

impl FromStr for DigestAlgorithm {
    type Err = UnknownDigest;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "md5" => Ok(Self::Md5),
            _ => Err(UnknownDigest(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            DigestAlgorithm::Sha256.digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn md5_matches_known_vector() {
        assert_eq!(
            DigestAlgorithm::Md5.digest("abc"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn digest_is_deterministic_over_multibyte_text() {
        let message = "空席があります。 確認してください。";
        let first = DigestAlgorithm::Sha256.digest(message);
        assert_eq!(first, DigestAlgorithm::Sha256.digest(message));
        assert_eq!(first.len(), 64);
        assert_ne!(first, DigestAlgorithm::Sha256.digest("空席があります。"));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("SHA-256".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha256));
        assert_eq!(" md5 ".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Md5));
        assert!("crc32".parse::<DigestAlgorithm>().is_err());
    }
}
