use std::fmt;

/// TLC taxi zone identifier (`LocationID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub u16);

impl ZoneId {
    /// Smallest valid LocationID.
    pub const MIN: u16 = 1;
    /// Largest valid LocationID; 264 and 265 are the "unknown" zones.
    pub const MAX: u16 = 263;

    /// Build a zone id from any integer, returning None outside the valid range.
    pub fn checked<T: TryInto<u16>>(value: T) -> Option<Self> {
        value.try_into().ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(ZoneId)
    }

    #[inline] pub fn is_valid(&self) -> bool { (Self::MIN..=Self::MAX).contains(&self.0) }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
