//! Running checksum over posted fragments.
//!
//! The acquisition side sums every data fragment it decodes the same way and
//! compares against the value posted at the end of a session, so a dropped
//! or doubled fragment shows up as a mismatch.

/// 16-bit checksum that wraps modulo 65536.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Checksum(u16);

impl Checksum {
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Adds a posted value. Only its low 16 bits affect the sum.
    pub fn add(&mut self, value: u32) {
        self.0 = self.0.wrapping_add(value as u16);
    }

    pub fn get(&self) -> u16 {
        self.0
    }

    /// Overwrites the running sum, usually with 0 at the start of a session.
    pub fn set(&mut self, value: u16) {
        self.0 = value;
    }
}

impl Extend<u16> for Checksum {
    fn extend<I: IntoIterator<Item = u16>>(&mut self, iter: I) {
        for fragment in iter {
            self.add(u32::from(fragment));
        }
    }
}
