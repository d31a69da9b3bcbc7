use std::io::{self, Read, Write};

/// A fixed-width PCM sample as stored in the data chunk.
///
/// 8-bit PCM is unsigned on the wire and is handled as raw `u8` values; 16- and
/// 32-bit PCM are signed. Narrowing always wraps (two's complement), it never
/// clamps.
pub trait Sample: Copy + Default + PartialEq + std::fmt::Debug {
    /// Size in bytes.
    const WIDTH: usize;

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self>;

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()>;

    fn to_i64(self) -> i64;

    /// Keeps the low `WIDTH` bytes of `value`.
    fn wrap_from_i64(value: i64) -> Self;

    /// Multiplies by `amplitude`, truncates toward zero and wraps into the sample width.
    fn scale(self, amplitude: f64) -> Self {
        // f64 -> i64 truncates (saturating only far outside any sample range),
        // i64 -> narrow wraps.
        Self::wrap_from_i64((self.to_i64() as f64 * amplitude) as i64)
    }
}

macro_rules! impl_sample {
    ($ty:ty, $width:expr) => {
        impl Sample for $ty {
            const WIDTH: usize = $width;

            fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
                let mut buf = [0u8; $width];
                reader.read_exact(&mut buf)?;
                Ok(<$ty>::from_le_bytes(buf))
            }

            fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
                writer.write_all(&self.to_le_bytes())
            }

            fn to_i64(self) -> i64 {
                self as i64
            }

            fn wrap_from_i64(value: i64) -> Self {
                value as $ty
            }
        }
    };
}

impl_sample!(u8, 1);
impl_sample!(i16, 2);
impl_sample!(i32, 4);
