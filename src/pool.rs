//! Process-wide pools of encoder buffers and decoder scratch space.
//!
//! A checked-out session is owned by its guard until the guard drops; it is never shared live.
//! Pools keep at most [`MAX_IDLE`] idle entries each and drop buffers that grew past their
//! retention ceiling instead of pooling them.

use core::mem;
use core::ops::{Deref, DerefMut};

use parking_lot::Mutex;

use crate::codec::MsgPackEncode;
use crate::decode::{DecodeOptions, Decoder};
use crate::encode::Encoder;
use crate::MsgPackError;

/// Idle entries kept per pool.
pub const MAX_IDLE: usize = 64;

/// Encoder buffers with a larger capacity are released instead of pooled.
pub const MAX_RETAINED_BUFFER: usize = 1 << 20;

/// Decoder skip stacks with a larger capacity are released instead of pooled.
pub const MAX_RETAINED_SCRATCH: usize = 1 << 12;

struct Pool<T> {
    idle: Mutex<Vec<T>>,
}

impl<T> Pool<T> {
    const fn new() -> Self {
        Self {
            idle: parking_lot::const_mutex(Vec::new()),
        }
    }

    fn take(&self) -> Option<T> {
        self.idle.lock().pop()
    }

    fn give(&self, item: T) -> bool {
        let mut idle = self.idle.lock();
        if idle.len() >= MAX_IDLE {
            return false;
        }
        idle.push(item);
        true
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

static ENCODERS: Pool<Encoder> = Pool::new();
static SCRATCH: Pool<Vec<usize>> = Pool::new();

/// An [`Encoder`] checked out of the pool; returned, cleared, on drop.
pub struct PooledEncoder {
    enc: Encoder,
}

/// Check an empty encoder out of the pool.
#[must_use]
pub fn encoder() -> PooledEncoder {
    let enc = ENCODERS.take().unwrap_or_default();
    trace!(capacity = enc.capacity(), "encoder checked out");
    PooledEncoder { enc }
}

impl PooledEncoder {
    /// Copy the encoded bytes out, keeping the buffer for the pool.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.enc.as_bytes().to_vec()
    }

    /// Take the encoded bytes; the buffer leaves the pool with them.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<u8> {
        mem::take(&mut self.enc).into_vec()
    }
}

impl Deref for PooledEncoder {
    type Target = Encoder;

    fn deref(&self) -> &Encoder {
        &self.enc
    }
}

impl DerefMut for PooledEncoder {
    fn deref_mut(&mut self) -> &mut Encoder {
        &mut self.enc
    }
}

impl Drop for PooledEncoder {
    fn drop(&mut self) {
        let mut enc = mem::take(&mut self.enc);
        let capacity = enc.capacity();
        if capacity == 0 || capacity > MAX_RETAINED_BUFFER {
            trace!(capacity, "encoder released");
            return;
        }
        enc.clear();
        if ENCODERS.give(enc) {
            trace!(capacity, "encoder returned");
        }
    }
}

/// A [`Decoder`] whose skip scratch is borrowed from the pool.
pub struct PooledDecoder<'de> {
    dec: Decoder<'de>,
}

/// Start a decoder over `bytes` that reuses pooled scratch space.
#[must_use]
pub fn decoder(bytes: &[u8], opts: DecodeOptions) -> PooledDecoder<'_> {
    let scratch = SCRATCH.take().unwrap_or_default();
    trace!(capacity = scratch.capacity(), "decoder checked out");
    PooledDecoder {
        dec: Decoder::with_scratch(bytes, opts, scratch),
    }
}

impl<'de> Deref for PooledDecoder<'de> {
    type Target = Decoder<'de>;

    fn deref(&self) -> &Decoder<'de> {
        &self.dec
    }
}

impl DerefMut for PooledDecoder<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dec
    }
}

impl Drop for PooledDecoder<'_> {
    fn drop(&mut self) {
        let mut scratch = self.dec.take_scratch();
        if scratch.capacity() == 0 || scratch.capacity() > MAX_RETAINED_SCRATCH {
            return;
        }
        scratch.clear();
        if SCRATCH.give(scratch) {
            trace!("decoder scratch returned");
        }
    }
}

/// Encode a value with a pooled encoder and copy the result out.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_to_vec<T: MsgPackEncode + ?Sized>(value: &T) -> Result<Vec<u8>, MsgPackError> {
    let mut enc = encoder();
    enc.encode(value)?;
    Ok(enc.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn pool_retains_at_most_max_idle() {
        let pool: Pool<Vec<u8>> = Pool::new();
        for _ in 0..MAX_IDLE {
            assert!(pool.give(Vec::new()));
        }
        assert!(!pool.give(Vec::new()));
        assert_eq!(pool.idle(), MAX_IDLE);
        assert!(pool.take().is_some());
        assert_eq!(pool.idle(), MAX_IDLE - 1);
    }

    #[test]
    fn pooled_encoder_starts_empty() {
        {
            let mut enc = encoder();
            enc.str("leftover").unwrap();
        }
        let enc = encoder();
        assert!(enc.is_empty());
    }

    #[test]
    fn pooled_sessions_round_trip() {
        let bytes = encode_to_vec(&[1u32, 2, 3][..]).unwrap();
        assert_eq!(bytes, [0x93, 0x01, 0x02, 0x03]);

        let mut dec = decoder(&bytes, DecodeOptions::DEFAULT);
        dec.skip_value().unwrap();
        assert!(dec.is_empty());

        let mut dec = decoder(&[0x91, 0xc0], DecodeOptions::DEFAULT);
        assert_eq!(dec.decode_value().unwrap(), Value::Array(vec![Value::Nil]));
    }

    #[test]
    fn into_vec_hands_out_the_buffer() {
        let mut enc = encoder();
        enc.bool(true).unwrap();
        assert_eq!(enc.into_vec(), [0xc3]);
    }
}
