//! 资格判定与内容协商的端到端用例。

use std::sync::Arc;

use bytes::Bytes;
use pagewire_core::{
    AcceptList, MediaType, PagesResponseWriter, PayloadDescriptor, ResponseWriter, WriterRegistry,
    codes,
};

fn pages_writer() -> PagesResponseWriter {
    PagesResponseWriter::with_integrity_verification(true)
}

#[test]
fn eligible_only_for_byte_page_sequences() {
    let writer = pages_writer();
    let pages = MediaType::exchange_pages();

    assert!(writer.is_eligible(&PayloadDescriptor::pages(), Some(&pages)));
    assert!(!writer.is_eligible(&PayloadDescriptor::sequence_of::<String>(), Some(&pages)));
    assert!(!writer.is_eligible(&PayloadDescriptor::sequence_of::<Vec<u8>>(), Some(&pages)));
    assert!(!writer.is_eligible(&PayloadDescriptor::single::<Bytes>(), Some(&pages)));
}

#[test]
fn eligibility_follows_media_compatibility() {
    let writer = pages_writer();
    let payload = PayloadDescriptor::pages();

    let accepted = ["*/*", "*", "application/*", "APPLICATION/X-EXCHANGE-PAGES;v=1"];
    for raw in accepted {
        let media = MediaType::parse(raw).unwrap();
        assert!(writer.is_eligible(&payload, Some(&media)), "{raw} 应被接受");
    }

    let rejected = ["application/json", "text/*", "application/octet-stream"];
    for raw in rejected {
        let media = MediaType::parse(raw).unwrap();
        assert!(!writer.is_eligible(&payload, Some(&media)), "{raw} 应被拒绝");
    }

    assert!(!writer.is_eligible(&payload, None), "缺失媒体类型视为不兼容");
}

#[test]
fn writer_advertises_unknown_length() {
    let writer = pages_writer();
    assert_eq!(writer.media_type().to_string(), "application/x-exchange-pages");
    assert_eq!(writer.size_hint(), None);
    assert_eq!(ResponseWriter::size_hint(&writer, &vec![Bytes::new()]), None);
}

#[test]
fn registry_negotiates_and_writes_through_erased_seam() {
    let mut registry = WriterRegistry::new();
    registry.register_shared(Arc::new(pages_writer()));
    assert_eq!(registry.len(), 1);

    let accept = AcceptList::parse("text/html;q=0.9, application/x-exchange-pages");
    let negotiated = registry
        .negotiate(&PayloadDescriptor::pages(), &accept)
        .expect("页写出器应被选中");
    assert_eq!(negotiated.media_type(), &MediaType::exchange_pages());

    let payload: Vec<Bytes> = vec![Bytes::from_static(b"p0"), Bytes::from_static(b"p1")];
    let mut sink = Vec::new();
    let outcome = negotiated
        .writer()
        .write_erased(&payload, &mut sink)
        .unwrap();
    assert!(outcome.is_completed());
    assert_eq!(&sink[16..], b"p0p1");

    let mut untouched = Vec::new();
    let err = negotiated
        .writer()
        .write_erased(&vec![String::from("nope")], &mut untouched)
        .unwrap_err();
    assert_eq!(err.code(), codes::WRITE_PAYLOAD_MISMATCH);
    assert!(untouched.is_empty());
}

#[test]
fn registry_without_match_returns_none() {
    let mut registry = WriterRegistry::new();
    registry.register(pages_writer());
    let accept = AcceptList::parse("application/json, text/plain;q=0.5");
    assert!(
        registry
            .negotiate(&PayloadDescriptor::pages(), &accept)
            .is_none()
    );
}
