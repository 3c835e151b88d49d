//! Shared plumbing for the `u64` flag newtypes.

/// Declares a `u64` flag set with named constants, set operators and a
/// name table used for display and configuration parsing.
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$flag_meta:meta])*
                const $flag:ident = $value:expr, $label:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            /// The empty set.
            pub const NONE: Self = Self(0);

            $(
                $(#[$flag_meta])*
                pub const $flag: Self = Self($value);
            )*

            const NAMED: &'static [(&'static str, Self)] = &[$(($label, Self::$flag)),*];

            /// Creates a set from raw bits.
            #[must_use]
            pub const fn from_bits(bits: u64) -> Self {
                Self(bits)
            }

            /// Returns the raw bits.
            #[must_use]
            pub const fn bits(self) -> u64 {
                self.0
            }

            /// Returns `true` if every bit of `other` is set in `self`.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Returns `true` if no bit is set.
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Bits set in both operands.
            #[must_use]
            pub const fn intersection(self, other: Self) -> Self {
                Self(self.0 & other.0)
            }

            /// Bits set in either operand.
            #[must_use]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Looks up a flag by its configuration name (case-insensitive).
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                let name = name.trim();
                Self::NAMED
                    .iter()
                    .find(|(label, _)| label.eq_ignore_ascii_case(name))
                    .map(|(_, flag)| *flag)
            }

            /// Names of the single-bit flags contained in this set.
            #[must_use]
            pub fn names(self) -> Vec<&'static str> {
                Self::NAMED
                    .iter()
                    .filter(|(_, flag)| flag.0.count_ones() == 1 && self.contains(*flag))
                    .map(|(label, _)| *label)
                    .collect()
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl std::ops::Not for $name {
            type Output = Self;

            fn not(self) -> Self {
                Self(!self.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if let Some((label, _)) = Self::NAMED.iter().find(|(_, flag)| *flag == *self) {
                    return f.write_str(label);
                }
                let names = self.names();
                if names.is_empty() {
                    write!(f, "{:#x}", self.0)
                } else {
                    f.write_str(&names.join(", "))
                }
            }
        }
    };
}

pub(crate) use flag_set;
