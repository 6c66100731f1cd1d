//! Power-state bitmask and its classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Raw power-state bitmask as reported by the virtualization host.
///
/// Bit values follow the vendor API. More than one bit may be set at once
/// (for example powered-on together with tools-running).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PowerStateBits(pub u32);

impl PowerStateBits {
    pub const POWERING_OFF: Self = Self(0x0001);
    pub const POWERED_OFF: Self = Self(0x0002);
    pub const POWERING_ON: Self = Self(0x0004);
    pub const POWERED_ON: Self = Self(0x0008);
    pub const SUSPENDING: Self = Self(0x0010);
    pub const SUSPENDED: Self = Self(0x0020);
    pub const TOOLS_RUNNING: Self = Self(0x0040);
    pub const RESETTING: Self = Self(0x0080);
    pub const BLOCKED_ON_MSG: Self = Self(0x0100);
    pub const PAUSED: Self = Self(0x0200);
    pub const RESUMING: Self = Self(0x0800);

    /// Returns the raw mask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Classifies the mask for reporting. See [`PowerState::classify`].
    #[must_use]
    pub fn classify(self) -> PowerState {
        PowerState::classify(self)
    }
}

impl std::ops::BitOr for PowerStateBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for PowerStateBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Run state of the VM for a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    /// The guest is powered on.
    PoweredOn,
    /// The guest is powered off.
    PoweredOff,
    /// The guest is suspended. Only produced by [`PowerState::describe`].
    Suspended,
    /// Anything between on and off, including suspend for reporting.
    InTransition,
    /// No recognised bit was set. Only produced by [`PowerState::describe`].
    Unknown,
}

impl PowerState {
    /// Classifies a bitmask in priority order: powered-on, then powered-off,
    /// then everything else as [`PowerState::InTransition`].
    ///
    /// The suspended bit folds into `InTransition`; the
    /// poller only distinguishes running, stopped and in-between.
    #[must_use]
    pub fn classify(bits: PowerStateBits) -> Self {
        if bits.contains(PowerStateBits::POWERED_ON) {
            Self::PoweredOn
        } else if bits.contains(PowerStateBits::POWERED_OFF) {
            Self::PoweredOff
        } else {
            Self::InTransition
        }
    }

    /// Finer-grained description used in diagnostics only.
    #[must_use]
    pub fn describe(bits: PowerStateBits) -> Self {
        match Self::classify(bits) {
            Self::InTransition if bits.bits() == 0 => Self::Unknown,
            Self::InTransition if bits.contains(PowerStateBits::SUSPENDED) => Self::Suspended,
            other => other,
        }
    }

    /// Short token written to the heartbeat file.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::PoweredOn => "RUNNING",
            Self::PoweredOff => "STOPPED",
            Self::Suspended | Self::InTransition | Self::Unknown => "TRANSITION",
        }
    }

    /// Whether the poll loop stops after observing this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::PoweredOff)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for PowerState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(Self::PoweredOn),
            "STOPPED" => Ok(Self::PoweredOff),
            "TRANSITION" => Ok(Self::InTransition),
            other => Err(CoreError::UnknownStateToken(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powered_on_wins_over_powered_off() {
        let bits = PowerStateBits::POWERED_ON | PowerStateBits::POWERED_OFF;
        assert_eq!(bits.classify(), PowerState::PoweredOn);
    }

    #[test]
    fn tools_running_does_not_change_classification() {
        let bits = PowerStateBits::POWERED_ON | PowerStateBits::TOOLS_RUNNING;
        assert_eq!(bits.classify(), PowerState::PoweredOn);
    }

    #[test]
    fn suspended_is_reported_as_transition() {
        let bits = PowerStateBits::SUSPENDED;
        assert_eq!(bits.classify(), PowerState::InTransition);
        assert_eq!(bits.classify().token(), "TRANSITION");
        assert_eq!(PowerState::describe(bits), PowerState::Suspended);
    }

    #[test]
    fn empty_mask_describes_as_unknown() {
        let bits = PowerStateBits::default();
        assert_eq!(bits.classify(), PowerState::InTransition);
        assert_eq!(PowerState::describe(bits), PowerState::Unknown);
    }

    #[test]
    fn only_powered_off_is_terminal() {
        assert!(PowerState::PoweredOff.is_terminal());
        assert!(!PowerState::PoweredOn.is_terminal());
        assert!(!PowerState::InTransition.is_terminal());
    }

    #[test]
    fn token_parses_back() {
        for state in [PowerState::PoweredOn, PowerState::PoweredOff, PowerState::InTransition] {
            let parsed: PowerState = match state.token().parse() {
                Ok(s) => s,
                Err(e) => panic!("unexpected error: {e}"),
            };
            assert_eq!(parsed, state);
        }
        assert!("PAUSED".parse::<PowerState>().is_err());
    }

    #[test]
    fn bits_display_as_hex() {
        assert_eq!(PowerStateBits::POWERED_ON.to_string(), "0x0008");
    }

    proptest::proptest! {
        #[test]
        fn proptest_powered_on_bit_always_classifies_on(extra in proptest::prelude::any::<u32>()) {
            let bits = PowerStateBits(extra | PowerStateBits::POWERED_ON.bits());
            proptest::prop_assert_eq!(bits.classify(), PowerState::PoweredOn);
        }

        #[test]
        fn proptest_off_without_on_classifies_off(extra in proptest::prelude::any::<u32>()) {
            let bits = PowerStateBits(
                (extra | PowerStateBits::POWERED_OFF.bits()) & !PowerStateBits::POWERED_ON.bits(),
            );
            proptest::prop_assert_eq!(bits.classify(), PowerState::PoweredOff);
        }

        #[test]
        fn proptest_neither_bit_classifies_transition(extra in proptest::prelude::any::<u32>()) {
            let mask = PowerStateBits::POWERED_ON.bits() | PowerStateBits::POWERED_OFF.bits();
            let bits = PowerStateBits(extra & !mask);
            proptest::prop_assert_eq!(bits.classify(), PowerState::InTransition);
        }
    }
}
