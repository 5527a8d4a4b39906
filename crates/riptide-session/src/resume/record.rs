//! Decoding of `.fastresume` files and magnet reconstruction.

use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use riptide_torrent_core::InfoHash;
use serde_bencode::value::Value;
use thiserror::Error;

use crate::error::ResumeError;

/// Characters escaped inside magnet query values; RFC 3986 unreserved
/// characters pass through.
const MAGNET_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Why a resume blob could not be turned into a [`ResumeRecord`].
#[derive(Debug, Error)]
pub enum RecordError {
    /// Not valid bencode.
    #[error("resume blob is not valid bencode")]
    Bencode(#[source] serde_bencode::Error),
    /// Valid bencode with the wrong shape.
    #[error("resume blob has an invalid structure")]
    Invalid(&'static str),
}

impl RecordError {
    /// Attach the file the blob was read from.
    #[must_use]
    pub fn at(self, path: &Path) -> ResumeError {
        match self {
            Self::Bencode(source) => ResumeError::Decode {
                path: path.to_path_buf(),
                source,
            },
            Self::Invalid(reason) => ResumeError::InvalidRecord {
                path: path.to_path_buf(),
                reason,
            },
        }
    }
}

/// The parts of a resume blob needed to re-add its torrent.
///
/// Everything else in the blob is engine-private and is handed back to the
/// engine untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeRecord {
    /// Content hash from the `info-hash` key.
    pub info_hash: InfoHash,
    /// Tier-grouped tracker URLs from the `trackers` key.
    pub trackers: Vec<Vec<String>>,
}

impl ResumeRecord {
    /// Decode the record fields from a bencoded resume blob.
    ///
    /// A missing `trackers` key means no trackers.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Bencode`] for malformed input and
    /// [`RecordError::Invalid`] when the top level is not a dictionary, the
    /// hash is missing or not 20 bytes, or the tracker list is not a list of
    /// lists of UTF-8 strings.
    pub fn decode(blob: &[u8]) -> Result<Self, RecordError> {
        let value: Value = serde_bencode::from_bytes(blob).map_err(RecordError::Bencode)?;
        let Value::Dict(mut fields) = value else {
            return Err(RecordError::Invalid("not_a_dictionary"));
        };

        let info_hash = match fields.remove(b"info-hash".as_slice()) {
            Some(Value::Bytes(bytes)) => InfoHash::from_slice(&bytes)
                .map_err(|_| RecordError::Invalid("info_hash_length"))?,
            Some(_) => return Err(RecordError::Invalid("info_hash_type")),
            None => return Err(RecordError::Invalid("info_hash_missing")),
        };

        let trackers = match fields.remove(b"trackers".as_slice()) {
            Some(Value::List(tiers)) => tiers
                .into_iter()
                .map(decode_tier)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(RecordError::Invalid("trackers_type")),
            None => Vec::new(),
        };

        Ok(Self {
            info_hash,
            trackers,
        })
    }

    /// Tracker URLs across all tiers, first occurrence kept.
    #[must_use]
    pub fn tracker_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for url in self.trackers.iter().flatten() {
            if !urls.contains(&url.as_str()) {
                urls.push(url);
            }
        }
        urls
    }

    /// `magnet:?xt=urn:btih:<hex>` followed by one `tr` parameter per tracker.
    #[must_use]
    pub fn magnet_uri(&self) -> String {
        let mut uri = format!("magnet:?xt=urn:btih:{}", self.info_hash.to_hex());
        for url in self.tracker_urls() {
            uri.push_str("&tr=");
            uri.extend(utf8_percent_encode(url, MAGNET_VALUE));
        }
        uri
    }
}

fn decode_tier(tier: Value) -> Result<Vec<String>, RecordError> {
    let Value::List(urls) = tier else {
        return Err(RecordError::Invalid("tracker_tier_type"));
    };
    urls.into_iter()
        .map(|url| match url {
            Value::Bytes(bytes) => {
                String::from_utf8(bytes).map_err(|_| RecordError::Invalid("tracker_utf8"))
            }
            _ => Err(RecordError::Invalid("tracker_type")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_test_support::{info_hash, resume_blob};

    #[test]
    fn decodes_hash_and_tiers_from_engine_blob() {
        let hash = info_hash(0x5a);
        let blob = resume_blob(
            &hash,
            &[
                &["udp://a.example:80/announce", "udp://b.example:80/announce"],
                &["http://c.example/announce"],
            ],
        );
        let record = ResumeRecord::decode(&blob).expect("decode");
        assert_eq!(record.info_hash, hash);
        assert_eq!(record.trackers.len(), 2);
        assert_eq!(record.trackers[1], vec!["http://c.example/announce"]);
    }

    #[test]
    fn magnet_lists_each_tracker_once_in_first_seen_order() {
        let record = ResumeRecord {
            info_hash: info_hash(0x01),
            trackers: vec![
                vec!["udp://a/announce".into(), "udp://b/announce".into()],
                vec!["udp://a/announce".into(), "http://c/x?y=1".into()],
            ],
        };
        assert_eq!(
            record.magnet_uri(),
            format!(
                "magnet:?xt=urn:btih:{}&tr=udp%3A%2F%2Fa%2Fannounce\
                 &tr=udp%3A%2F%2Fb%2Fannounce&tr=http%3A%2F%2Fc%2Fx%3Fy%3D1",
                "01".repeat(20)
            )
        );
    }

    #[test]
    fn missing_trackers_yield_a_bare_magnet() {
        let hash = info_hash(0x02);
        let record = ResumeRecord::decode(&resume_blob(&hash, &[])).expect("decode");
        assert!(record.trackers.is_empty());
        assert_eq!(record.magnet_uri(), format!("magnet:?xt=urn:btih:{hash}"));
    }

    #[test]
    fn structural_problems_are_reported_by_reason() {
        assert!(matches!(
            ResumeRecord::decode(b"not bencode"),
            Err(RecordError::Bencode(_))
        ));
        assert!(matches!(
            ResumeRecord::decode(b"li1ee"),
            Err(RecordError::Invalid("not_a_dictionary"))
        ));
        assert!(matches!(
            ResumeRecord::decode(b"d9:info-hash3:abce"),
            Err(RecordError::Invalid("info_hash_length"))
        ));
        assert!(matches!(
            ResumeRecord::decode(b"d4:name1:xe"),
            Err(RecordError::Invalid("info_hash_missing"))
        ));
    }

    #[test]
    fn trackers_must_be_lists_of_strings() {
        let mut fields = std::collections::HashMap::new();
        fields.insert(b"info-hash".to_vec(), Value::Bytes(vec![3; 20]));
        fields.insert(b"trackers".to_vec(), Value::List(vec![Value::Int(1)]));
        let blob = serde_bencode::to_bytes(&Value::Dict(fields)).expect("encode");
        assert!(matches!(
            ResumeRecord::decode(&blob),
            Err(RecordError::Invalid("tracker_tier_type"))
        ));
    }

    #[test]
    fn errors_are_bound_to_their_file() {
        let err = RecordError::Invalid("info_hash_missing").at(Path::new("/r/x.fastresume"));
        assert!(matches!(
            &err,
            ResumeError::InvalidRecord { reason: "info_hash_missing", .. }
        ));
        assert_eq!(err.path(), Path::new("/r/x.fastresume"));
    }
}
