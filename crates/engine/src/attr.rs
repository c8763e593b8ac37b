use std::fmt;

use log::warn;
use serde::{Serialize, Serializer};
use shatag_runtime::{XATTR_SHA256, XATTR_TS};

use crate::{error::DecodeWarning, timestamp::Timestamp};

/// Length of a sha256 digest in raw bytes.
pub const DIGEST_LEN: usize = 32;
/// Length of a sha256 digest in its stored hex form.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// A sha256 content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode a stored digest attribute.
    ///
    /// Values longer than 64 characters keep their first 64 characters and
    /// log a warning; anything shorter or not hex is rejected.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeWarning> {
        if raw.len() < DIGEST_HEX_LEN {
            return Err(DecodeWarning::Incomplete { len: raw.len() });
        }

        if raw.len() > DIGEST_HEX_LEN {
            let w = DecodeWarning::TrailingGarbage {
                extra: raw.len() - DIGEST_HEX_LEN,
            };
            warn!("{XATTR_SHA256} xattr: {w}");
        }

        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(&raw[..DIGEST_HEX_LEN], &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Attributes found on the file. Either half may be missing or unreadable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoredAttr {
    pub timestamp: Option<Timestamp>,
    pub digest: Option<Digest>,
}

/// Attributes computed from the file as it is now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActualAttr {
    pub timestamp: Timestamp,
    pub digest: Digest,
}

impl From<ActualAttr> for StoredAttr {
    fn from(actual: ActualAttr) -> Self {
        Self {
            timestamp: Some(actual.timestamp),
            digest: Some(actual.digest),
        }
    }
}

/// Attribute values in their on-disk byte form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAttr {
    pub digest: Vec<u8>,
    pub timestamp: Vec<u8>,
}

/// Build a [`StoredAttr`] from raw attribute values. Bad values degrade to
/// `None` and never fail the check.
pub fn decode_stored(raw_digest: Option<&[u8]>, raw_ts: Option<&[u8]>) -> StoredAttr {
    let digest = raw_digest.and_then(|raw| match Digest::decode(raw) {
        Ok(d) => Some(d),
        Err(w) => {
            warn!("{XATTR_SHA256} xattr: {w}");
            None
        }
    });

    let timestamp = raw_ts
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .and_then(Timestamp::parse);

    if raw_ts.is_some() && timestamp.is_none() {
        warn!("{XATTR_TS} xattr: unparsable value, treating as missing");
    }

    StoredAttr { timestamp, digest }
}

pub fn encode(attr: &ActualAttr) -> EncodedAttr {
    EncodedAttr {
        digest: attr.digest.to_hex().into_bytes(),
        timestamp: attr.timestamp.to_string().into_bytes(),
    }
}

/// Display helper for an optional digest, dashes when unknown.
pub struct OptDigest(pub Option<Digest>);

impl fmt::Display for OptDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(d) => write!(f, "{d}"),
            None => f.write_str(&"-".repeat(DIGEST_HEX_LEN)),
        }
    }
}

#[cfg(test)]
#[path = "attr_tests.rs"]
mod tests;
