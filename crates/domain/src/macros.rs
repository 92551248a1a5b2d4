//! String conversions for status enums
//!
//! Status enums are persisted as lowercase text columns and travel over the
//! wire as the same strings. One macro generates `as_str`, `Display` and
//! `FromStr` so the three never drift apart.
//!
//! # Example
//!
//! ```rust
//! use callslot_domain::impl_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum LeaseState {
//!     Open,
//!     Closed,
//! }
//!
//! impl_status_conversions!(LeaseState {
//!     Open => "open",
//!     Closed => "closed",
//! });
//!
//! assert_eq!(LeaseState::Open.as_str(), "open");
//! assert_eq!("CLOSED".parse::<LeaseState>(), Ok(LeaseState::Closed));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a status enum.
///
/// Parsing is case-insensitive and ignores surrounding whitespace; the error
/// message names the enum so column corruption is easy to trace.
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase representation.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum DoorState {
        Open,
        Ajar,
        Shut,
    }

    impl_status_conversions!(DoorState {
        Open => "open",
        Ajar => "ajar",
        Shut => "shut",
    });

    #[test]
    fn display_matches_as_str() {
        for state in [DoorState::Open, DoorState::Ajar, DoorState::Shut] {
            assert_eq!(state.to_string(), state.as_str());
        }
    }

    #[test]
    fn parsing_is_case_insensitive_and_trims() {
        assert_eq!(DoorState::from_str("AJAR"), Ok(DoorState::Ajar));
        assert_eq!(DoorState::from_str(" shut "), Ok(DoorState::Shut));
    }

    #[test]
    fn unknown_value_names_the_enum() {
        let err = DoorState::from_str("missing").unwrap_err();
        assert_eq!(err, "Invalid DoorState: missing");
        assert!(DoorState::from_str("").is_err());
    }
}
