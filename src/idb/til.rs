//! Type-library section ("til") signature check.
//!
//! The til payload format is not decoded by this library; only the 6-byte
//! signature is checked, and the raw payload is exposed for callers that
//! bring their own type-library parser.

use crate::idb::constants::*;
use crate::IdbError;

/// The type-library section.
pub struct Til<'a> {
    payload: &'a [u8],
}

impl<'a> Til<'a> {
    /// Wrap the section payload; it must at least hold the signature.
    pub fn parse(payload: &'a [u8]) -> Result<Self, IdbError> {
        if payload.len() < TIL_SIGNATURE.len() {
            return Err(IdbError::Corrupt(format!(
                "til section of {} bytes is shorter than its signature",
                payload.len()
            )));
        }
        Ok(Til { payload })
    }

    /// Check the `IDATIL` signature.
    pub fn validate(&self) -> Result<(), IdbError> {
        if &self.payload[..TIL_SIGNATURE.len()] != TIL_SIGNATURE {
            return Err(IdbError::BadSignature(format!(
                "til signature {:02x?}",
                &self.payload[..TIL_SIGNATURE.len()]
            )));
        }
        Ok(())
    }

    /// The raw, undecoded section payload (signature included).
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}
