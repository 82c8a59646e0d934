//! Property tests: encode→decode round-trips for protocol lines.

use proptest::prelude::*;

use tgbridge_proto::Line;

/// A token that can appear as a command or middle parameter: no spaces, no
/// CR/LF, not starting with `:`.
fn token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9#&+!@._-]{1,16}"
}

/// Trailing text: spaces allowed, no CR/LF.
fn trailing() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 #&+!@:._-]{0,64}"
}

prop_compose! {
    fn arb_line()(
        prefix in proptest::option::of(token()),
        command in token(),
        params in proptest::collection::vec(token(), 0..4),
        trailing in proptest::option::of(trailing()),
    ) -> Line {
        Line { prefix, command, params, trailing }
    }
}

proptest! {
    #[test]
    fn encode_decode_round_trip(line in arb_line()) {
        let encoded = line.to_string();
        // Only lines within the wire limit are sendable at all.
        prop_assume!(encoded.len() <= 512);
        let decoded = Line::parse(&encoded).expect("serialized line must parse");
        prop_assert_eq!(decoded, line);
    }

    #[test]
    fn parse_never_panics(raw in "\\PC{0,256}") {
        let _ = Line::parse(&raw);
    }
}
