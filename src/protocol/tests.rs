use super::frame::{self, ACK_BYTE, HEADER_WIDTH};
use super::instruction::{self, Instruction};
use crate::utils::BrokerError;
use tokio::io::{AsyncWriteExt, duplex};

#[test]
fn test_encode_pads_header_to_fixed_width() {
    let encoded = frame::encode("hello");
    assert_eq!(encoded.len(), HEADER_WIDTH + 5);
    assert!(encoded.starts_with(b"5 "));
    assert!(encoded[1..HEADER_WIDTH].iter().all(|b| *b == b' '));
    assert_eq!(&encoded[HEADER_WIDTH..], b"hello");
}

#[test]
fn test_encode_counts_bytes_not_chars() {
    let encoded = frame::encode("héllo");
    assert_eq!(frame::parse_header(&encoded[..HEADER_WIDTH]).unwrap(), 6);
}

#[test]
fn test_parse_header_rejects_garbage() {
    let mut header = [b' '; HEADER_WIDTH];
    header[..3].copy_from_slice(b"abc");
    match frame::parse_header(&header) {
        Err(BrokerError::MalformedFrame(h)) => assert_eq!(h, "abc"),
        other => panic!("expected MalformedFrame, got {other:?}"),
    }

    let blank = [b' '; HEADER_WIDTH];
    assert!(matches!(
        frame::parse_header(&blank),
        Err(BrokerError::MalformedFrame(_))
    ));
}

#[tokio::test]
async fn test_frame_roundtrip_across_chunk_boundaries() {
    for len in [0, 1, 63, 64, 65, 100, 128, 200] {
        let payload = "x".repeat(len);
        let (mut a, mut b) = duplex(1024);
        frame::write_frame(&mut a, &payload).await.unwrap();
        let read = frame::read_frame(&mut b).await.unwrap();
        assert_eq!(read, payload, "length {len}");
    }
}

#[tokio::test]
async fn test_long_frame_does_not_consume_next_frame() {
    let first = "a".repeat(100);
    let (mut a, mut b) = duplex(4096);
    frame::write_frame(&mut a, &first).await.unwrap();
    frame::write_frame(&mut a, "PING").await.unwrap();

    assert_eq!(frame::read_frame(&mut b).await.unwrap(), first);
    assert_eq!(frame::read_frame(&mut b).await.unwrap(), "PING");
}

#[tokio::test]
async fn test_read_frame_on_closed_stream_is_reset() {
    let (a, mut b) = duplex(64);
    drop(a);
    assert!(matches!(
        frame::read_frame(&mut b).await,
        Err(BrokerError::ConnectionReset)
    ));
}

#[tokio::test]
async fn test_oversized_header_is_reset_not_a_panic() {
    for len in [usize::MAX, 1_000_000_000_000] {
        let (mut a, mut b) = duplex(256);
        let header = format!("{:<width$}", len, width = HEADER_WIDTH);
        a.write_all(header.as_bytes()).await.unwrap();
        a.write_all(b"only a few bytes").await.unwrap();
        drop(a);
        assert!(
            matches!(frame::read_frame(&mut b).await, Err(BrokerError::ConnectionReset)),
            "length {len}"
        );
    }
}

#[tokio::test]
async fn test_read_frame_truncated_payload_is_reset() {
    let (mut a, mut b) = duplex(256);
    let encoded = frame::encode("truncated payload");
    a.write_all(&encoded[..HEADER_WIDTH + 4]).await.unwrap();
    drop(a);
    assert!(matches!(
        frame::read_frame(&mut b).await,
        Err(BrokerError::ConnectionReset)
    ));
}

#[tokio::test]
async fn test_read_frame_rejects_invalid_utf8() {
    let (mut a, mut b) = duplex(256);
    let mut raw = format!("{:<width$}", 2, width = HEADER_WIDTH).into_bytes();
    raw.extend_from_slice(&[0xff, 0xfe]);
    a.write_all(&raw).await.unwrap();
    assert!(matches!(
        frame::read_frame(&mut b).await,
        Err(BrokerError::Encoding(_))
    ));
}

#[tokio::test]
async fn test_ack_roundtrip_and_bad_byte() {
    let (mut a, mut b) = duplex(8);
    frame::write_ack(&mut a).await.unwrap();
    frame::read_ack(&mut b).await.unwrap();

    a.write_all(b"0").await.unwrap();
    assert!(matches!(
        frame::read_ack(&mut b).await,
        Err(BrokerError::BadAcknowledgement(b'0'))
    ));
}

#[test]
fn test_publish_builder_appends_space_per_arg() {
    let instr = Instruction::publish("news", &["hello", "world"]);
    assert_eq!(
        instr,
        Instruction::Publish {
            topic: "news".to_string(),
            payload: "hello world ".to_string(),
        }
    );
    assert_eq!(
        instr.to_payload().unwrap(),
        "publish$news$hello world ".to_string()
    );
}

#[test]
fn test_parse_instructions() {
    assert_eq!(
        Instruction::parse("publish$news$hello world "),
        Some(Instruction::Publish {
            topic: "news".into(),
            payload: "hello world ".into(),
        })
    );
    assert_eq!(
        Instruction::parse("subscribe$news"),
        Some(Instruction::subscribe("news"))
    );
    assert_eq!(Instruction::parse("PING"), Some(Instruction::Ping));
    assert_eq!(Instruction::parse("PONG"), Some(Instruction::Pong));
    assert_eq!(
        Instruction::parse("Disconnect"),
        Some(Instruction::Disconnect)
    );
}

#[test]
fn test_parse_keeps_dollar_inside_payload() {
    assert_eq!(
        Instruction::parse("publish$prices$cost: $5 "),
        Some(Instruction::Publish {
            topic: "prices".into(),
            payload: "cost: $5 ".into(),
        })
    );
}

#[test]
fn test_parse_rejects_incomplete_instructions() {
    assert_eq!(Instruction::parse("publish$news"), None);
    assert_eq!(Instruction::parse("publish$$hello"), None);
    assert_eq!(Instruction::parse("subscribe$"), None);
    assert_eq!(Instruction::parse("subscribe"), None);
    assert_eq!(Instruction::parse("hello there"), None);
}

#[test]
fn test_ping_token_matched_by_containment() {
    assert_eq!(Instruction::parse("PING from peer"), Some(Instruction::Ping));
}

#[test]
fn test_acknowledge_is_a_single_raw_byte() {
    assert_eq!(Instruction::Acknowledge.to_wire(), vec![ACK_BYTE]);
    assert_eq!(Instruction::Acknowledge.to_payload(), None);
}

#[test]
fn test_result_frames() {
    let framed = instruction::result_frame("news", "hello world ");
    assert_eq!(framed, "news$hello world ");
    assert_eq!(
        instruction::split_result(&framed),
        Some(("news", "hello world "))
    );
    assert_eq!(
        instruction::no_messages_notice("missing"),
        "< There wasn't any published message for missing topic >"
    );
}
