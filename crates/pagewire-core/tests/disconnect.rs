//! 失败策略：对端断开被吞掉，其余故障带步骤上抛，且从不重试。

use std::io::{self, Write};

use bytes::Bytes;
use pagewire_core::{FrameStage, IoSink, PagesResponseWriter, WriteError, WriteOutcome, codes};

/// 接受 `limit` 字节后以 `kind` 失败，并记录每次调用。
struct ScriptedWriter {
    accepted: Vec<u8>,
    limit: usize,
    kind: io::ErrorKind,
    write_calls: usize,
    flush_calls: usize,
    fail_flush: bool,
}

impl ScriptedWriter {
    fn new(limit: usize, kind: io::ErrorKind) -> Self {
        Self {
            accepted: Vec::new(),
            limit,
            kind,
            write_calls: 0,
            flush_calls: 0,
            fail_flush: false,
        }
    }

    fn failing_flush(kind: io::ErrorKind) -> Self {
        Self {
            fail_flush: true,
            ..Self::new(usize::MAX, kind)
        }
    }
}

impl Write for ScriptedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_calls += 1;
        let room = self.limit.saturating_sub(self.accepted.len());
        if room == 0 {
            return Err(io::Error::from(self.kind));
        }
        let n = room.min(buf.len());
        self.accepted.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_calls += 1;
        if self.fail_flush {
            Err(io::Error::from(self.kind))
        } else {
            Ok(())
        }
    }
}

fn pages() -> Vec<Bytes> {
    vec![Bytes::from(vec![1u8; 32]), Bytes::from(vec![2u8; 32])]
}

#[test]
fn disconnect_mid_page_completes_silently() {
    for kind in [
        io::ErrorKind::BrokenPipe,
        io::ErrorKind::ConnectionReset,
        io::ErrorKind::UnexpectedEof,
    ] {
        let writer = PagesResponseWriter::with_integrity_verification(true);
        // 零容量缓冲：每次写出直达底层，便于定位失败步骤。
        let mut sink = IoSink::with_capacity(0, ScriptedWriter::new(20, kind));
        let outcome = writer.write(&pages(), &mut sink).expect("断开不应表现为错误");
        assert_eq!(
            outcome,
            WriteOutcome::PeerClosed {
                stage: FrameStage::Page { index: 0 }
            },
            "{kind:?}"
        );
        assert_eq!(sink.get_ref().accepted.len(), 20);
        assert_eq!(sink.get_ref().flush_calls, 0);
    }
}

#[test]
fn disconnect_on_flush_completes_silently() {
    let writer = PagesResponseWriter::with_integrity_verification(false);
    let mut sink = IoSink::new(ScriptedWriter::failing_flush(io::ErrorKind::BrokenPipe));
    let outcome = writer.write(&pages(), &mut sink).unwrap();
    assert_eq!(
        outcome,
        WriteOutcome::PeerClosed {
            stage: FrameStage::Flush
        }
    );
}

#[test]
fn other_failures_propagate_with_stage() {
    let writer = PagesResponseWriter::with_integrity_verification(false);
    let mut sink = IoSink::with_capacity(0, ScriptedWriter::new(4, io::ErrorKind::PermissionDenied));
    let err = writer.write(&pages(), &mut sink).unwrap_err();

    assert_eq!(err.code(), codes::WRITE_IO);
    assert_eq!(err.stage(), Some(FrameStage::Checksum));
    match &err {
        WriteError::Io { source, .. } => {
            assert_eq!(source.io_error().kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let calls = sink.get_ref().write_calls;
    assert_eq!(calls, 2, "失败后不得重试");
}

#[test]
fn flush_failure_propagates() {
    let writer = PagesResponseWriter::with_integrity_verification(true);
    let mut sink = IoSink::new(ScriptedWriter::failing_flush(io::ErrorKind::Other));
    let err = writer.write(&pages(), &mut sink).unwrap_err();
    assert_eq!(err.stage(), Some(FrameStage::Flush));
    assert!(err.to_string().contains("flush"));
}

#[test]
fn writer_never_closes_sink() {
    let writer = PagesResponseWriter::with_integrity_verification(true);
    let mut sink = IoSink::new(Vec::new());
    writer.write(&pages(), &mut sink).unwrap();
    writer.write(&pages(), &mut sink).unwrap();
    let written = sink.into_inner().unwrap();
    assert_eq!(written.len(), 2 * (16 + 64), "同一输出端可以连续写出多帧");
}
