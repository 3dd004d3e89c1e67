//! Identifier types for algorithms, methods and bundle entries

use std::fmt;

/// Stable identifier of an algorithm family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlgorithmId(pub u32);

/// Stable identifier of a computation method within an algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "algorithm#{}", self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method#{}", self.0)
    }
}

/// Key of a parameter, input, result or partial-result entry
///
/// Each algorithm declares its own small enums of ids; the bundles store
/// entries by [`BundleId::code`] and use [`BundleId::name`] in error messages.
pub trait BundleId: Copy {
    fn code(self) -> u32;
    fn name(self) -> &'static str;
}

/// Declare a fieldless enum usable as a [`BundleId`]
///
/// ```
/// numkernel_core::bundle_ids! {
///     /// Inputs of a toy algorithm
///     pub enum ToyInput {
///         Data = 0 => "data",
///         Weights = 1 => "weights",
///     }
/// }
/// use numkernel_core::bundle::BundleId;
/// assert_eq!(ToyInput::Weights.code(), 1);
/// assert_eq!(ToyInput::Data.name(), "data");
/// ```
#[macro_export]
macro_rules! bundle_ids {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl $name {
            /// Every id of this kind, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl $crate::bundle::BundleId for $name {
            #[inline]
            fn code(self) -> u32 {
                self as u32
            }

            #[inline]
            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::bundle_ids! {
        enum Sample {
            First = 0 => "first",
            Third = 2 => "third",
        }
    }

    #[test]
    fn test_macro_generates_codes_and_names() {
        assert_eq!(Sample::First.code(), 0);
        assert_eq!(Sample::Third.code(), 2);
        assert_eq!(Sample::Third.name(), "third");
        assert_eq!(Sample::ALL.len(), 2);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(AlgorithmId(3).to_string(), "algorithm#3");
        assert_eq!(MethodId(0).to_string(), "method#0");
    }
}
