//! # Session State Machine
//!
//! ```text
//! pending --> processing --> active --> completed
//!    |            |            |
//!    +------------+------------+--> failed | cancelled
//! ```
//!
//! Terminal states never transition. `merkle_root` is set only on the way
//! into `completed`, and an anchor txid is only accepted once a root exists.

use super::errors::{SessionError, SessionResult};
use shared_types::{ChunkRecord, Hash, SessionRecord, SessionStatus};

/// Whether `from -> to` is an edge of the lifecycle graph.
pub fn can_transition(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;
    matches!(
        (from, to),
        (Pending, Processing)
            | (Processing, Active)
            | (Active, Completed)
            | (Pending | Processing | Active, Failed)
            | (Pending | Processing | Active, Cancelled)
    )
}

fn transition(record: &mut SessionRecord, to: SessionStatus, now: u64) -> SessionResult<()> {
    if record.status.is_terminal() {
        return Err(SessionError::AlreadyTerminal(record.status));
    }
    if !can_transition(record.status, to) {
        return Err(SessionError::InvalidTransition {
            from: record.status,
            to,
        });
    }
    record.status = to;
    if to.is_terminal() {
        record.completed_at = Some(now);
    }
    Ok(())
}

/// `pending -> processing`, when a pipeline takes the session.
pub fn begin_processing(record: &mut SessionRecord, now: u64) -> SessionResult<()> {
    transition(record, SessionStatus::Processing, now)
}

/// Append the next chunk. Returns `true` when this was the first chunk and
/// the session became `active`.
pub fn append_chunk(
    record: &mut SessionRecord,
    chunk: ChunkRecord,
    encryption_ms: u64,
    now: u64,
) -> SessionResult<bool> {
    match record.status {
        SessionStatus::Processing | SessionStatus::Active => {}
        status if status.is_terminal() => return Err(SessionError::AlreadyTerminal(status)),
        status => {
            return Err(SessionError::InvalidTransition {
                from: status,
                to: SessionStatus::Active,
            })
        }
    }
    let expected = record.next_chunk_index();
    if chunk.index != expected {
        return Err(SessionError::IndexOutOfOrder {
            expected,
            got: chunk.index,
        });
    }

    record
        .metadata
        .record_chunk(chunk.size_bytes, chunk.compressed_size_bytes, encryption_ms);
    record.chunks.push(chunk);

    if record.status == SessionStatus::Processing {
        transition(record, SessionStatus::Active, now)?;
        return Ok(true);
    }
    Ok(false)
}

/// `active -> completed` with the session root.
pub fn complete(
    record: &mut SessionRecord,
    root: Hash,
    merkle_build_ms: u64,
    now: u64,
) -> SessionResult<()> {
    transition(record, SessionStatus::Completed, now)?;
    record.merkle_root = Some(root);
    record.metadata.merkle_build_time_ms = merkle_build_ms;
    Ok(())
}

/// Any non-terminal state `-> failed`.
pub fn fail(record: &mut SessionRecord, reason: impl Into<String>, now: u64) -> SessionResult<()> {
    transition(record, SessionStatus::Failed, now)?;
    record.failure_reason = Some(reason.into());
    Ok(())
}

/// Any non-terminal state `-> cancelled`.
pub fn cancel(record: &mut SessionRecord, reason: Option<String>, now: u64) -> SessionResult<()> {
    transition(record, SessionStatus::Cancelled, now)?;
    record.failure_reason = reason;
    Ok(())
}

/// Attach the anchor transaction id. Requires a root.
pub fn set_anchor_txid(record: &mut SessionRecord, txid: String) -> SessionResult<()> {
    if record.merkle_root.is_none() || record.status != SessionStatus::Completed {
        return Err(SessionError::AnchorBeforeRoot(record.id));
    }
    record.anchor_txid = Some(txid);
    record.anchor_pending = false;
    Ok(())
}

/// Retry budget exhausted. The session stays `completed`.
pub fn mark_anchor_pending(record: &mut SessionRecord) -> SessionResult<()> {
    if record.merkle_root.is_none() {
        return Err(SessionError::AnchorBeforeRoot(record.id));
    }
    record.anchor_pending = true;
    Ok(())
}

/// Anchor reached the confirmation threshold.
pub fn mark_anchor_confirmed(record: &mut SessionRecord) -> SessionResult<()> {
    if record.anchor_txid.is_none() {
        return Err(SessionError::AnchorBeforeRoot(record.id));
    }
    record.anchor_confirmed = true;
    record.anchor_pending = false;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{OwnerAddress, SessionId};

    fn record() -> SessionRecord {
        SessionRecord::new(
            SessionId::new(),
            OwnerAddress::parse("TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE").unwrap(),
            100,
        )
    }

    fn chunk(index: u64) -> ChunkRecord {
        ChunkRecord {
            chunk_id: format!("c-{index}"),
            index,
            size_bytes: 100,
            compressed_size_bytes: 40,
            compressed: true,
            hash: [index as u8; 32],
            encryption_nonce: vec![0; 24],
            encryption_key_id: "k".into(),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut r = record();
        begin_processing(&mut r, 101).unwrap();
        assert!(append_chunk(&mut r, chunk(0), 2, 102).unwrap());
        assert!(!append_chunk(&mut r, chunk(1), 3, 103).unwrap());
        assert_eq!(r.status, SessionStatus::Active);
        assert_eq!(r.metadata.original_size, 200);
        assert_eq!(r.metadata.compressed_size, 80);
        assert_eq!(r.metadata.encryption_time_ms, 5);

        complete(&mut r, [9; 32], 7, 104).unwrap();
        assert_eq!(r.status, SessionStatus::Completed);
        assert_eq!(r.merkle_root, Some([9; 32]));
        assert_eq!(r.completed_at, Some(104));
        assert_eq!(r.metadata.merkle_build_time_ms, 7);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut r = record();
        cancel(&mut r, None, 101).unwrap();
        assert_eq!(
            begin_processing(&mut r, 102),
            Err(SessionError::AlreadyTerminal(SessionStatus::Cancelled))
        );
        assert_eq!(
            fail(&mut r, "late", 103),
            Err(SessionError::AlreadyTerminal(SessionStatus::Cancelled))
        );
    }

    #[test]
    fn test_cannot_complete_without_chunks() {
        let mut r = record();
        begin_processing(&mut r, 101).unwrap();
        assert_eq!(
            complete(&mut r, [1; 32], 0, 102),
            Err(SessionError::InvalidTransition {
                from: SessionStatus::Processing,
                to: SessionStatus::Completed
            })
        );
        assert!(r.merkle_root.is_none());
    }

    #[test]
    fn test_out_of_order_chunk_rejected() {
        let mut r = record();
        begin_processing(&mut r, 101).unwrap();
        append_chunk(&mut r, chunk(0), 0, 102).unwrap();
        assert_eq!(
            append_chunk(&mut r, chunk(2), 0, 103),
            Err(SessionError::IndexOutOfOrder {
                expected: 1,
                got: 2
            })
        );
        assert_eq!(r.chunks.len(), 1);
    }

    #[test]
    fn test_chunk_before_processing_rejected() {
        let mut r = record();
        assert!(matches!(
            append_chunk(&mut r, chunk(0), 0, 101),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_anchor_requires_root() {
        let mut r = record();
        assert_eq!(
            set_anchor_txid(&mut r, "tx".into()),
            Err(SessionError::AnchorBeforeRoot(r.id))
        );

        begin_processing(&mut r, 101).unwrap();
        append_chunk(&mut r, chunk(0), 0, 102).unwrap();
        complete(&mut r, [1; 32], 0, 103).unwrap();
        mark_anchor_pending(&mut r).unwrap();
        assert!(r.anchor_pending);
        set_anchor_txid(&mut r, "tx".into()).unwrap();
        assert!(!r.anchor_pending);
        mark_anchor_confirmed(&mut r).unwrap();
        assert!(r.anchor_confirmed);
    }

    #[test]
    fn test_transition_table() {
        use SessionStatus::*;
        assert!(can_transition(Pending, Processing));
        assert!(can_transition(Active, Cancelled));
        assert!(!can_transition(Pending, Active));
        assert!(!can_transition(Completed, Failed));
        assert!(!can_transition(Active, Processing));
    }
}
