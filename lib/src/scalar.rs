//! Fixed-width scalar values the engine is monomorphized over.

use crate::dumpable::Element;
use byteorder::{ByteOrder as _, LittleEndian};
use std::fmt;

/// A fixed-width scalar that can be scanned for.
///
/// Comparisons order integers exactly; floats apply a small epsilon so that
/// near-equal readings do not flap between refinement passes.
pub trait Scalar: Element + PartialEq + PartialOrd + fmt::Display {
    /// `self > reference`, with the float epsilon applied.
    fn above(self, reference: Self) -> bool;

    /// `self < reference`, with the float epsilon applied.
    fn below(self, reference: Self) -> bool;

    /// `self - other`, wrapping for integers.
    fn difference(self, other: Self) -> Self;
}

macro_rules! int_scalar {
    ($(($ty:ty, $size:expr, $read:ident, $write:ident),)*) => {
        $(
            impl Element for $ty {
                const WIRE_SIZE: usize = $size;

                fn read(buf: &[u8]) -> Self {
                    LittleEndian::$read(buf) as $ty
                }

                fn write(self, out: &mut Vec<u8>) {
                    let mut buf = [0u8; $size];
                    LittleEndian::$write(&mut buf, self as _);
                    out.extend_from_slice(&buf);
                }
            }

            impl Scalar for $ty {
                fn above(self, reference: Self) -> bool {
                    self > reference
                }

                fn below(self, reference: Self) -> bool {
                    self < reference
                }

                fn difference(self, other: Self) -> Self {
                    self.wrapping_sub(other)
                }
            }
        )*
    };
}

int_scalar! {
    (u16, 2, read_u16, write_u16),
    (i16, 2, read_i16, write_i16),
    (u32, 4, read_u32, write_u32),
    (i32, 4, read_i32, write_i32),
    (u64, 8, read_u64, write_u64),
    (i64, 8, read_i64, write_i64),
}

impl Element for u8 {
    const WIRE_SIZE: usize = 1;

    fn read(buf: &[u8]) -> Self {
        buf[0]
    }

    fn write(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Scalar for u8 {
    fn above(self, reference: Self) -> bool {
        self > reference
    }

    fn below(self, reference: Self) -> bool {
        self < reference
    }

    fn difference(self, other: Self) -> Self {
        self.wrapping_sub(other)
    }
}

impl Element for i8 {
    const WIRE_SIZE: usize = 1;

    fn read(buf: &[u8]) -> Self {
        buf[0] as i8
    }

    fn write(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}

impl Scalar for i8 {
    fn above(self, reference: Self) -> bool {
        self > reference
    }

    fn below(self, reference: Self) -> bool {
        self < reference
    }

    fn difference(self, other: Self) -> Self {
        self.wrapping_sub(other)
    }
}

macro_rules! float_scalar {
    ($(($ty:ty, $size:expr, $read:ident, $write:ident, $epsilon:expr),)*) => {
        $(
            impl Element for $ty {
                const WIRE_SIZE: usize = $size;

                fn read(buf: &[u8]) -> Self {
                    LittleEndian::$read(buf)
                }

                fn write(self, out: &mut Vec<u8>) {
                    let mut buf = [0u8; $size];
                    LittleEndian::$write(&mut buf, self);
                    out.extend_from_slice(&buf);
                }
            }

            impl Scalar for $ty {
                fn above(self, reference: Self) -> bool {
                    self > reference + $epsilon
                }

                fn below(self, reference: Self) -> bool {
                    self < reference - $epsilon
                }

                fn difference(self, other: Self) -> Self {
                    self - other
                }
            }
        )*
    };
}

float_scalar! {
    (f32, 4, read_f32, write_f32, 0.0001f32),
    (f64, 8, read_f64, write_f64, 0.0000001f64),
}

#[cfg(test)]
mod tests {
    use super::{Element, Scalar};

    #[test]
    fn test_wire_round_trip() {
        let mut buf = Vec::new();
        0x1234_5678i32.write(&mut buf);
        (-7i32).write(&mut buf);

        assert_eq!(8, buf.len());
        assert_eq!(0x1234_5678i32, i32::read(&buf));
        assert_eq!(-7i32, i32::read(&buf[4..]));
        // Little-endian layout.
        assert_eq!(&[0x78, 0x56, 0x34, 0x12], &buf[..4]);
    }

    #[test]
    fn test_float_epsilon_ordering() {
        assert!(!1.00005f32.above(1.0));
        assert!(1.001f32.above(1.0));
        assert!(!0.99995f32.below(1.0));
        assert!(0.999f32.below(1.0));
    }

    #[test]
    fn test_integer_difference_wraps() {
        assert_eq!(6u8, 2u8.difference(252));
        assert_eq!(-4i32, 6i32.difference(10));
    }
}
