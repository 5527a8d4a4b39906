//! Save and restore of the engine's opaque session-state blob.

use std::io::{Read, Write};

use riptide_torrent_core::EngineSession;
use tracing::debug;

use crate::error::{SessionError, SessionResult};

/// Serialize the session state and write it to `writer`.
///
/// # Errors
///
/// Returns [`SessionError::State`] when the engine cannot produce the blob
/// and [`SessionError::StateIo`] when writing fails.
pub fn write_state(session: &dyn EngineSession, writer: &mut impl Write) -> SessionResult<()> {
    let blob = session
        .save_state()
        .map_err(|source| SessionError::State {
            operation: "state.save",
            source,
        })?;
    writer
        .write_all(&blob)
        .and_then(|()| writer.flush())
        .map_err(|source| SessionError::StateIo {
            operation: "state.write",
            source,
        })?;
    debug!(bytes = blob.len(), "session state written");
    Ok(())
}

/// Read a blob from `reader` and restore it into the session.
///
/// # Errors
///
/// Returns [`SessionError::StateIo`] when reading fails and
/// [`SessionError::State`] when the engine rejects the blob.
pub fn load_state(session: &dyn EngineSession, reader: &mut impl Read) -> SessionResult<()> {
    let mut blob = Vec::new();
    reader
        .read_to_end(&mut blob)
        .map_err(|source| SessionError::StateIo {
            operation: "state.read",
            source,
        })?;
    session
        .load_state(&blob)
        .map_err(|source| SessionError::State {
            operation: "state.load",
            source,
        })?;
    debug!(bytes = blob.len(), "session state restored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_test_support::FakeSession;

    #[test]
    fn state_round_trips_through_a_buffer() {
        let source = FakeSession::new();
        let mut buffer = Vec::new();
        write_state(source.as_ref(), &mut buffer).expect("write");
        assert_eq!(buffer, source.state_blob());

        let target = FakeSession::new();
        load_state(target.as_ref(), &mut b"d3:dhtdee".as_slice()).expect("load");
        assert_eq!(target.state_blob(), b"d3:dhtdee");
    }

    #[test]
    fn rejected_blob_surfaces_the_engine_error() {
        let session = FakeSession::new();
        let err = load_state(session.as_ref(), &mut b"garbage".as_slice()).expect_err("rejected");
        assert!(matches!(
            err,
            SessionError::State {
                operation: "state.load",
                ..
            }
        ));
    }
}
