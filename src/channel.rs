//! 2.4 GHz channel numbering.

use std::fmt;

/// A legal 2.4 GHz receive channel (1 through 13).
///
/// # Example
///
/// ```
/// use csi_sniffer::Channel;
///
/// let ch = Channel::new(13).unwrap();
/// assert_eq!(ch.next().get(), 1);
/// assert!(Channel::new(14).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    /// Lowest legal channel.
    pub const MIN: Channel = Channel(1);
    /// Highest legal channel.
    pub const MAX: Channel = Channel(13);

    /// Returns the channel if `n` is within 1..=13.
    pub const fn new(n: u8) -> Option<Self> {
        if n >= Self::MIN.0 && n <= Self::MAX.0 {
            Some(Self(n))
        } else {
            None
        }
    }

    /// Returns the channel number.
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// The next channel in hop order, wrapping 13 back to 1.
    pub const fn next(&self) -> Self {
        Self(self.0 % Self::MAX.0 + 1)
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Channel {
    type Error = crate::RadioError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n).ok_or(crate::RadioError::InvalidChannel(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bounds() {
        assert!(Channel::new(0).is_none());
        assert!(Channel::new(1).is_some());
        assert!(Channel::new(13).is_some());
        assert!(Channel::new(14).is_none());
    }

    #[test]
    fn test_next_wraps_to_one() {
        assert_eq!(Channel::MAX.next(), Channel::MIN);
    }

    #[test]
    fn test_full_cycle_visits_every_channel_once() {
        let mut ch = Channel::MIN;
        let mut seen = Vec::new();
        for _ in 0..13 {
            seen.push(ch.get());
            ch = ch.next();
        }
        assert_eq!(seen, (1..=13).collect::<Vec<u8>>());
        assert_eq!(ch, Channel::MIN);
    }

    #[test]
    fn test_try_from_rejects_out_of_range() {
        assert!(Channel::try_from(0).is_err());
        assert_eq!(Channel::try_from(6).unwrap().get(), 6);
    }
}
