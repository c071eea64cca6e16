//! Arbitrary-precision values returned by the oracle.
//!
//! The contract returns a `uint256`, which does not fit a machine word.
//! `SampledValue` keeps the full magnitude until a caller narrows it with
//! `to_u64`, which refuses values that would not fit.

use std::fmt;
use std::str::FromStr;

use crate::error::OracleError;

/// A non-negative integer of arbitrary width.
///
/// Stored as big-endian magnitude bytes without leading zeros, so zero is
/// the empty vector and equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SampledValue {
    magnitude: Vec<u8>,
}

impl SampledValue {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build from a big-endian byte string such as an ABI word.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        Self {
            magnitude: bytes[start..].to_vec(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// Narrow to `u64`, or `None` if the value exceeds `u64::MAX`.
    pub fn to_u64(&self) -> Option<u64> {
        if self.magnitude.len() > 8 {
            return None;
        }
        Some(
            self.magnitude
                .iter()
                .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
        )
    }

    fn mul_add(&mut self, mul: u8, add: u8) {
        let mut carry = u16::from(add);
        for byte in self.magnitude.iter_mut().rev() {
            let v = u16::from(*byte) * u16::from(mul) + carry;
            *byte = (v & 0xff) as u8;
            carry = v >> 8;
        }
        if carry > 0 {
            self.magnitude.insert(0, carry as u8);
        }
    }

    /// Divide in place, returning the remainder.
    fn div_rem(&mut self, div: u8) -> u8 {
        let mut rem = 0u16;
        for byte in self.magnitude.iter_mut() {
            let cur = (rem << 8) | u16::from(*byte);
            *byte = (cur / u16::from(div)) as u8;
            rem = cur % u16::from(div);
        }
        let start = self
            .magnitude
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(self.magnitude.len());
        self.magnitude.drain(..start);
        rem as u8
    }
}

impl From<u64> for SampledValue {
    fn from(v: u64) -> Self {
        Self::from_be_bytes(&v.to_be_bytes())
    }
}

impl FromStr for SampledValue {
    type Err = OracleError;

    /// Parse a base-10 string. Anything other than ASCII digits is a read
    /// error, since it can only come from a malformed oracle response.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OracleError::Read(format!("not a decimal integer: {s:?}")));
        }
        let mut value = Self::zero();
        for b in s.bytes() {
            value.mul_add(10, b - b'0');
        }
        Ok(value)
    }
}

impl fmt::Display for SampledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        let mut rest = self.clone();
        let mut digits = Vec::new();
        while !rest.is_zero() {
            digits.push(b'0' + rest.div_rem(10));
        }
        digits.reverse();
        f.write_str(&String::from_utf8_lossy(&digits))
    }
}
