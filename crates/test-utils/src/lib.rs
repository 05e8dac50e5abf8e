//! Test utilities shared between the MCTP crates.
//!
//! Frames are built from plain bytes so that the helpers can be used by every crate in the
//! workspace without depending on any of them.

/// A result type useful in tests, that wraps any error implementation.
pub type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Macro for creating parametrized tests.
///
/// The `param_test!` macro accepts the name of an existing function, followed by a list of case
/// names and their arguments. It expands to a module with a `#[test]` function for each of the
/// cases, each calling the named function with the provided arguments.
///
/// ```
/// # use test_utils::param_test;
/// #
/// param_test! {
///     test_tag_owner: [
///         owned: (0x0b, true),
///         echoed: (0x03, false)
///     ]
/// }
/// fn test_tag_owner(tag: u8, owner: bool) {
///     assert_eq!(tag & 0x08 != 0, owner);
/// }
/// ```
///
/// Test functions may also return a [`Result`], and attributes such as `#[ignore]` may be
/// added to individual cases.
#[macro_export]
macro_rules! param_test {
    ($func_name:ident -> $return_ty:ty: [
        $( $(#[$outer:meta])* $case_name:ident: ( $($args:expr),+ )  ),+$(,)?
    ]) => {
        mod $func_name {
            use super::*;

            $(
                #[test]
                $(#[$outer])*
                fn $case_name() -> $return_ty {
                    $func_name($($args),+)
                }
            )*
        }
    };
    ($func_name:ident: [
        $( $(#[$outer:meta])* $case_name:ident: ( $($args:expr),+ ) ),+$(,)?
    ]) => {
        param_test!($func_name -> (): [ $( $(#[$outer])* $case_name: ( $($args),+ ) ),+ ]);
    };
}

/// The flags byte of an MCTP header: `[ SOM | EOM | seq:2 | TO | tag:3 ]`.
///
/// Tags are given in their 4-bit form, including the tag-owner bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(pub u8);

impl Flags {
    const SOM: u8 = 0x80;
    const EOM: u8 = 0x40;

    fn new(som: bool, eom: bool, sequence: u8, tag: u8) -> Self {
        let mut byte = (sequence & 0x03) << 4 | tag & 0x0f;
        if som {
            byte |= Self::SOM;
        }
        if eom {
            byte |= Self::EOM;
        }
        Self(byte)
    }

    /// A message carried in a single packet.
    pub fn single(tag: u8) -> Self {
        Self::new(true, true, 0, tag)
    }

    /// The first packet of a fragmented message.
    pub fn first(sequence: u8, tag: u8) -> Self {
        Self::new(true, false, sequence, tag)
    }

    /// A packet in the middle of a fragmented message.
    pub fn middle(sequence: u8, tag: u8) -> Self {
        Self::new(false, false, sequence, tag)
    }

    /// The last packet of a fragmented message.
    pub fn last(sequence: u8, tag: u8) -> Self {
        Self::new(false, true, sequence, tag)
    }
}

/// Builds a version 1 MCTP frame.
pub fn frame(destination: u8, source: u8, flags: Flags, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x01, destination, source, flags.0];
    frame.extend_from_slice(payload);
    frame
}

/// Splits a message into the frames of consecutive packets of at most `fragment_size` payload
/// bytes, numbering the packets from `first_sequence`.
///
/// A message that fits in one packet produces a single frame with both SOM and EOM set.
pub fn split_message(
    destination: u8,
    source: u8,
    tag: u8,
    first_sequence: u8,
    message: &[u8],
    fragment_size: usize,
) -> Vec<Vec<u8>> {
    assert!(fragment_size > 0, "fragments must carry data");
    let count = message.chunks(fragment_size).count();

    message
        .chunks(fragment_size)
        .enumerate()
        .map(|(i, chunk)| {
            let sequence = first_sequence.wrapping_add(i as u8);
            let flags = Flags::new(i == 0, i + 1 == count, sequence, tag);
            frame(destination, source, flags, chunk)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    param_test! {
        flags_byte: [
            single_owned: (Flags::single(0x08), 0xc8),
            first: (Flags::first(0, 3), 0x83),
            last: (Flags::last(1, 3), 0x53),
            middle_wrapped: (Flags::middle(6, 7), 0x27)
        ]
    }
    fn flags_byte(flags: Flags, expected: u8) {
        assert_eq!(flags.0, expected);
    }

    #[test]
    fn frame_prepends_header() {
        assert_eq!(
            frame(8, 16, Flags::single(0x08), &[0x01]),
            [0x01, 0x08, 0x10, 0xc8, 0x01]
        );
    }

    #[test]
    fn split_numbers_packets() {
        let frames = split_message(8, 16, 0x03, 3, &[1, 2, 3, 4, 5], 2);

        assert_eq!(
            frames,
            [
                vec![0x01, 8, 16, 0xb3, 1, 2],
                vec![0x01, 8, 16, 0x03, 3, 4],
                vec![0x01, 8, 16, 0x53, 5],
            ]
        );
    }

    #[test]
    fn split_short_message() {
        assert_eq!(
            split_message(8, 16, 0x0b, 2, &[7], 64),
            [vec![0x01, 8, 16, 0xeb, 7]]
        );
    }
}
