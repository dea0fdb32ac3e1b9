//! The decoder must produce the same frames however the body is split.

use serde_json::json;

use simo_chat::session::ConversationSession;
use simo_chat::stream::{DeltaAccumulator, Frame, FrameDecoder};

const BODY: &str = concat!(
    ": keep-alive\n",
    "\n",
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
    "\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Risque \"}}]}\r\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"élevé \"}}]}\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"⚖️ 規制\"}}]}\n",
    "data: [DONE]\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"after done\"}}]}\n",
);

fn decode_in(chunks: &[&[u8]]) -> Vec<Frame> {
    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();
    for chunk in chunks {
        frames.extend(decoder.feed(chunk));
    }
    frames.extend(decoder.finish());
    frames
}

fn expected() -> Vec<Frame> {
    vec![
        Frame::Data(json!({"choices":[{"delta":{"role":"assistant"}}]})),
        Frame::Data(json!({"choices":[{"delta":{"content":"Risque "}}]})),
        Frame::Data(json!({"choices":[{"delta":{"content":"élevé "}}]})),
        Frame::Data(json!({"choices":[{"delta":{"content":"⚖️ 規制"}}]})),
        Frame::Done,
    ]
}

#[test]
fn test_single_chunk() {
    assert_eq!(decode_in(&[BODY.as_bytes()]), expected());
}

#[test]
fn test_every_two_way_split() {
    let bytes = BODY.as_bytes();
    for split in 0..=bytes.len() {
        let (head, tail) = bytes.split_at(split);
        assert_eq!(decode_in(&[head, tail]), expected(), "split at byte {}", split);
    }
}

#[test]
fn test_byte_by_byte() {
    let chunks: Vec<&[u8]> = BODY.as_bytes().chunks(1).collect();
    assert_eq!(decode_in(&chunks), expected());
}

#[test]
fn test_accumulated_text_is_split_independent() {
    let bytes = BODY.as_bytes();
    for size in 1..=17 {
        let mut decoder = FrameDecoder::new();
        let mut session = ConversationSession::new();
        session.begin_assistant_turn().unwrap();

        'feed: for chunk in bytes.chunks(size) {
            for frame in decoder.feed(chunk) {
                match frame {
                    Frame::Data(payload) => {
                        DeltaAccumulator.apply(&mut session, &payload).unwrap();
                    }
                    Frame::Done => break 'feed,
                }
            }
        }

        let reply = session.complete_in_flight().unwrap();
        assert_eq!(reply.content, "Risque élevé ⚖️ 規制", "chunk size {}", size);
    }
}

#[test]
fn test_object_split_across_lines_is_reassembled_at_any_split() {
    let body = "data: {\"choices\":[{\"delta\":\n{\"content\":\"joined\"}}]}\ndata: [DONE]\n";
    let bytes = body.as_bytes();
    for split in 0..=bytes.len() {
        let (head, tail) = bytes.split_at(split);
        assert_eq!(
            decode_in(&[head, tail]),
            vec![
                Frame::Data(json!({"choices":[{"delta":{"content":"joined"}}]})),
                Frame::Done,
            ],
            "split at byte {}",
            split
        );
    }
}

fn decode_with_bound(body: &[u8], chunk_size: usize, max: usize) -> Vec<Frame> {
    let mut decoder = FrameDecoder::with_max_pending_bytes(max);
    let mut frames = Vec::new();
    for chunk in body.chunks(chunk_size) {
        frames.extend(decoder.feed(chunk));
    }
    frames.extend(decoder.finish());
    frames
}

#[test]
fn test_line_bound_is_split_independent() {
    let max = 1024;
    let long = format!(
        "data: {}\n",
        json!({"choices":[{"delta":{"content":"a".repeat(2000)}}]})
    );
    let short = format!(
        "data: {}\n",
        json!({"choices":[{"delta":{"content":"b".repeat(900)}}]})
    );
    let body = format!("{}{}data: [DONE]\n", long, short);
    let bytes = body.as_bytes();

    let expected = vec![
        Frame::Data(json!({"choices":[{"delta":{"content":"b".repeat(900)}}]})),
        Frame::Done,
    ];
    for chunk_size in [1, 7, 100, 1000, 1024, 4096, bytes.len()] {
        assert_eq!(
            decode_with_bound(bytes, chunk_size, max),
            expected,
            "chunk size {}",
            chunk_size
        );
    }
}
