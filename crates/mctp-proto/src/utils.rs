//! Utils used internally in other modules.

/// Creates an enum for a short integer code point such as the MCTP message type.
///
/// Named variants map to a single value; catch-all variants keep the raw value for every code
/// point in their range not claimed by a named variant. Bidirectional [`From`] implementations
/// are generated for the representation type.
macro_rules! encoded_type {
    (
        $(#[$outer:meta])*
        pub enum $name:ident ($representation_type:ty) {
            $($(#[$doc:meta])* $variant:ident = $value:literal),*;
            $($(#[$doc_other:meta])* $variant_other:ident = $range:pat,)*
        }
    ) => {
        $(#[$outer])*
        #[non_exhaustive]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$doc])* $variant,)*
            $($(#[$doc_other])* $variant_other($representation_type),)*
        }

        impl From<$representation_type> for $name {
            fn from(value: $representation_type) -> Self {
                #[allow(clippy::match_overlapping_arm)]
                match value {
                    $($value => Self::$variant,)*
                    #[allow(clippy::redundant_pattern)]
                    $(x@$range => Self::$variant_other(x),)*
                }
            }
        }

        impl From<$name> for $representation_type {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $value,)*
                    $($name::$variant_other(x) => x,)*
                }
            }
        }
    };
}
pub(crate) use encoded_type;
