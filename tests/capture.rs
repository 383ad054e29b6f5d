use fileexec::exec::capture::{strip_carriage_returns, truncate_stderr};
use fileexec::exec::{MAX_STDERR_BYTES, TRUNCATION_MARKER};
use proptest::prelude::*;

#[test]
fn short_single_line_is_unchanged() {
    assert_eq!(truncate_stderr(b"permission denied".to_vec()), b"permission denied");
}

#[test]
fn lone_trailing_newline_is_dropped_without_marker() {
    assert_eq!(truncate_stderr(b"bad input\n".to_vec()), b"bad input");
}

#[test]
fn additional_lines_are_replaced_by_marker() {
    assert_eq!(truncate_stderr(b"one\ntwo\nthree".to_vec()), b"one...");
}

#[test]
fn leading_newline_keeps_the_buffer() {
    assert_eq!(truncate_stderr(b"\nafter".to_vec()), b"\nafter");
}

#[test]
fn oversized_buffer_is_capped_with_marker() {
    let out = truncate_stderr(vec![b'x'; MAX_STDERR_BYTES * 2]);
    assert_eq!(out.len(), MAX_STDERR_BYTES + TRUNCATION_MARKER.len());
    assert!(out.ends_with(TRUNCATION_MARKER));
}

#[test]
fn carriage_returns_are_stripped() {
    assert_eq!(strip_carriage_returns(b"a\r\nb\r\n"), b"a\nb\n");
}

proptest! {
    #[test]
    fn truncated_stderr_is_bounded(buf in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let long = buf.len() > MAX_STDERR_BYTES;
        let out = truncate_stderr(buf);

        prop_assert!(out.len() <= MAX_STDERR_BYTES + TRUNCATION_MARKER.len());
        if long {
            prop_assert!(out.ends_with(TRUNCATION_MARKER));
        }
    }

    #[test]
    fn single_line_within_cap_is_untouched(line in "[ -~]{0,512}") {
        let out = truncate_stderr(line.clone().into_bytes());
        prop_assert_eq!(out, line.into_bytes());
    }
}
