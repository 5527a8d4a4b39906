//! Status snapshots, native alerts and resume records for tests.

use std::collections::HashMap;

use riptide_torrent_core::{AlertCategory, AlertKind, InfoHash, NativeAlert, TorrentStatus};
use serde_bencode::value::Value;

/// Hash whose 20 bytes all equal `byte`.
#[must_use]
pub const fn info_hash(byte: u8) -> InfoHash {
    InfoHash::new([byte; 20])
}

/// Auto-managed torrent with metadata, still downloading at `progress`.
#[must_use]
pub fn downloading(hash: InfoHash, name: &str, progress: f32) -> TorrentStatus {
    TorrentStatus {
        info_hash: hash,
        name: name.to_string(),
        save_path: "/downloads".to_string(),
        has_metadata: true,
        auto_managed: true,
        progress,
        ..TorrentStatus::default()
    }
}

/// Auto-managed torrent with metadata and every piece downloaded.
#[must_use]
pub fn finished(hash: InfoHash, name: &str) -> TorrentStatus {
    downloading(hash, name, 1.0)
}

/// Native alert with no torrent or payload attached.
#[must_use]
pub fn native_alert(kind: AlertKind, category: AlertCategory, message: &str) -> NativeAlert {
    NativeAlert {
        type_code: kind.code(),
        category,
        what: format!("{kind:?}"),
        message: message.to_string(),
        torrent: None,
        resume_data: None,
        error: None,
    }
}

/// Bencoded resume record as the engine writes it: `info-hash`, tier-grouped
/// `trackers`, and the engine's own bookkeeping keys.
///
/// # Panics
///
/// Panics if bencoding fails, which only happens on serializer bugs.
#[must_use]
pub fn resume_blob(hash: &InfoHash, trackers: &[&[&str]]) -> Vec<u8> {
    let tiers = trackers
        .iter()
        .map(|tier| {
            Value::List(
                tier.iter()
                    .map(|url| Value::Bytes(url.as_bytes().to_vec()))
                    .collect(),
            )
        })
        .collect();

    let mut record = HashMap::new();
    record.insert(
        b"file-format".to_vec(),
        Value::Bytes(b"libtorrent resume file".to_vec()),
    );
    record.insert(b"file-version".to_vec(), Value::Int(1));
    record.insert(b"info-hash".to_vec(), Value::Bytes(hash.as_bytes().to_vec()));
    record.insert(b"trackers".to_vec(), Value::List(tiers));
    record.insert(b"total_uploaded".to_vec(), Value::Int(0));

    serde_bencode::to_bytes(&Value::Dict(record)).expect("bencode resume record")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_blob_is_a_bencoded_dictionary_with_the_hash() {
        let hash = info_hash(0x42);
        let blob = resume_blob(&hash, &[&["udp://a/announce"], &["udp://b/announce"]]);
        assert_eq!(blob.first(), Some(&b'd'));
        assert_eq!(blob.last(), Some(&b'e'));

        let decoded: Value = serde_bencode::from_bytes(&blob).expect("decode");
        let Value::Dict(record) = decoded else {
            panic!("expected dictionary");
        };
        assert_eq!(
            record.get(b"info-hash".as_slice()),
            Some(&Value::Bytes(vec![0x42; 20]))
        );
    }
}
