//! Traits and helpers shared by the types that have an MCTP wire format.

use bytes::{BufMut, Bytes, BytesMut};

/// A trait for types decodable from a wire format, without any additional information.
pub trait WireDecode<T>: Sized {
    /// The error type returned on a failed decode.
    type Error;

    /// Decodes an object from the provided data, such as a [`bytes::Buf`].
    ///
    /// The buffer is advanced by as many bytes as necessary to decode the object. Nothing is
    /// consumed when the length checks preceding the decode fail.
    fn decode(data: &mut T) -> Result<Self, Self::Error>;
}

/// A trait for types encodable to their wire format.
pub trait WireEncode {
    /// The error type returned on a failed encode.
    type Error: std::fmt::Debug;

    /// The number of bytes written by [`Self::encode_to`].
    fn encoded_length(&self) -> usize;

    /// Encodes the object to the end of the provided buffer.
    fn encode_to<T: BufMut>(&self, buffer: &mut T) -> Result<(), Self::Error>;

    /// Encodes the object into a newly allocated [`Bytes`].
    fn encode_to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.encoded_length());
        self.encode_to(&mut buffer).unwrap(); // BytesMut will grow as needed
        buffer.freeze()
    }
}

macro_rules! bounded_uint {
    (
        $(#[$outer:meta])*
        pub struct $name:ident($type:ty : $bits:literal);
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Default)]
        pub struct $name($type);

        impl $name {
            /// The number of bits useable for an instance of this type.
            pub const BITS: u32 = $bits;

            /// The maximum possible value for an instance of this type.
            pub const MAX: Self = Self((1 << $bits) - 1);

            /// Create a new instance if the value is at most `Self::MAX.get()`.
            pub const fn new(value: $type) -> Option<Self> {
                if value <= Self::MAX.0 {
                    Some(Self(value))
                } else {
                    None
                }
            }

            /// Create a new instance from the low [`Self::BITS`] bits of the value.
            pub const fn new_truncated(value: $type) -> Self {
                Self(value & Self::MAX.0)
            }

            /// Get the value of this instance as its underlying type.
            #[inline]
            pub const fn get(&self) -> $type {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
pub(crate) use bounded_uint;
