//! Purpose: Capability set shared by incremental digests.
//! Exports: `IncrementalDigest`.
//! Role: Lets callers write code generic over native-backed digests.
//! Invariants: Every operation is fallible; native status codes are never swallowed.
use crate::core::digest::Digest;
use crate::core::error::Error;

pub trait IncrementalDigest: Sized {
    fn update(&mut self, data: &[u8]) -> Result<(), Error>;

    fn reset(&mut self) -> Result<(), Error>;

    fn finish(&mut self) -> Result<Vec<u8>, Error>;

    fn block_length(&self) -> Result<u32, Error>;

    fn digest_length(&self) -> Result<u32, Error>;

    /// Independent copy with the same accumulated input.
    fn duplicate(&self) -> Result<Self, Error>;

    /// Lowercase hex of `finish()`.
    fn hexdigest(&mut self) -> Result<String, Error> {
        Ok(hex::encode(self.finish()?))
    }

    /// Chaining form of `update`.
    fn chain(mut self, data: &[u8]) -> Result<Self, Error> {
        self.update(data)?;
        Ok(self)
    }
}

impl IncrementalDigest for Digest {
    fn update(&mut self, data: &[u8]) -> Result<(), Error> {
        Digest::update(self, data)
    }

    fn reset(&mut self) -> Result<(), Error> {
        Digest::reset(self)
    }

    fn finish(&mut self) -> Result<Vec<u8>, Error> {
        Digest::finish(self)
    }

    fn block_length(&self) -> Result<u32, Error> {
        Digest::block_length(self)
    }

    fn digest_length(&self) -> Result<u32, Error> {
        Digest::digest_length(self)
    }

    fn duplicate(&self) -> Result<Self, Error> {
        self.try_clone()
    }
}
