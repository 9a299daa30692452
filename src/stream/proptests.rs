//! Property-based tests for frame decoding
//!
//! Frame output must not depend on how the network chunked the body.

use super::FrameDecoder;
use proptest::prelude::*;

/// Split `bytes` at the given (unsorted, possibly repeated) cut points
fn split_at_points(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<Vec<u8>> {
    cuts.iter_mut().for_each(|c| *c %= bytes.len() + 1);
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

fn decode_all(chunks: &[Vec<u8>]) -> Vec<String> {
    let mut decoder = FrameDecoder::new();
    chunks.iter().flat_map(|c| decoder.push(c)).collect()
}

/// Payload text: no newlines, may contain multi-byte characters
fn arb_payload() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 {}\":,éü🎨]{0,40}"
}

/// Non-data line the decoder must skip
fn arb_noise_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(": keepalive".to_string()),
        "event: [a-z_]{1,20}",
        "id: [0-9]{1,5}",
    ]
}

proptest! {
    #[test]
    fn prop_two_frames_survive_any_split(cuts in proptest::collection::vec(0usize..64, 0..16)) {
        let body = b"data: A\ndata: B\n";
        let frames = decode_all(&split_at_points(body, cuts));
        prop_assert_eq!(frames, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn prop_chunking_does_not_change_frames(
        records in proptest::collection::vec((arb_payload(), arb_noise_line(), any::<bool>()), 0..12),
        cuts in proptest::collection::vec(0usize..2048, 0..32),
    ) {
        let mut body = String::new();
        let mut expected = Vec::new();
        for (payload, noise, crlf) in &records {
            let eol = if *crlf { "\r\n" } else { "\n" };
            body.push_str(noise);
            body.push_str(eol);
            body.push_str("data: ");
            body.push_str(payload);
            body.push_str(eol);
            expected.push(payload.clone());
        }

        let whole = decode_all(&[body.clone().into_bytes()]);
        let chunked = decode_all(&split_at_points(body.as_bytes(), cuts));
        prop_assert_eq!(&whole, &expected);
        prop_assert_eq!(chunked, expected);
    }

    #[test]
    fn prop_unterminated_tail_never_delivered(payload in arb_payload()) {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(format!("data: {payload}").as_bytes());
        prop_assert!(frames.is_empty());
    }
}
