//! Dense, typed indices into the network's junction and pipe tables.

use core::fmt;
use core::num::NonZeroU32;

macro_rules! element_id {
    ($(#[$doc:meta])* $name:ident, $tag:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Id of the element stored at `slot`.
            pub fn from_index(slot: u32) -> Self {
                Self(NonZeroU32::MIN.saturating_add(slot))
            }

            pub fn index(self) -> u32 {
                self.0.get() - 1
            }

            pub fn slot(self) -> usize {
                self.index() as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $tag, self.index())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.index())
            }
        }
    };
}

element_id!(
    /// Junction slot in an assembled network.
    JunctionId,
    "J"
);
element_id!(
    /// Pipe slot in an assembled network.
    PipeId,
    "P"
);
