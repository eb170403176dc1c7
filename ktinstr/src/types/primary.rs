#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents an integer type with a specific bit width.
///
/// Signedness is not represented here; all integer types are treated as unsigned.
/// Instructions that operate on signed integers will interpret the bits accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct IType {
    num_bits: u32,
}

impl IType {
    pub const I1: Self = Self { num_bits: 1 };
    pub const I8: Self = Self { num_bits: 8 };
    pub const I16: Self = Self { num_bits: 16 };
    pub const I32: Self = Self { num_bits: 32 };
    pub const I64: Self = Self { num_bits: 64 };
    pub const MIN_BITS: u32 = 1;
    pub const MAX_BITS: u32 = (1 << 23) - 1;

    /// Creates a new `IType` with the specified number of bits.
    #[inline]
    pub const fn new(num_bits: u32) -> Option<Self> {
        if num_bits >= Self::MIN_BITS && num_bits <= Self::MAX_BITS {
            Some(Self { num_bits })
        } else {
            None
        }
    }

    /// Returns the number of bits of the integer type.
    #[inline]
    pub const fn num_bits(&self) -> u32 {
        self.num_bits
    }
}

impl std::fmt::Display for IType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.num_bits)
    }
}

/// Represents a floating-point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FType {
    /// 16-bit floating point value (IEEE-754 binary16)
    Fp16,

    /// 16-bit "brain" floating point value (7-bit significand).
    Bf16,

    /// 32-bit floating point value (IEEE-754 binary32)
    Fp32,

    /// 64-bit floating point value (IEEE-754 binary64)
    Fp64,

    /// 128-bit floating point value (IEEE-754 binary128)
    Fp128,
}

impl FType {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            FType::Fp16 => "half",
            FType::Bf16 => "bfloat",
            FType::Fp32 => "float",
            FType::Fp64 => "double",
            FType::Fp128 => "fp128",
        }
    }
}

impl std::fmt::Display for FType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}
