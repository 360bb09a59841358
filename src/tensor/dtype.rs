//! Element data types
//!
//! Maps the scalar types a tensor may hold to their byte widths.

use std::fmt;

/// Scalar element type of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// 32-bit IEEE float
    #[default]
    Float32,
    /// 16-bit IEEE float
    Float16,
    /// 16-bit brain float
    BFloat16,
    /// 64-bit IEEE float
    Float64,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// Boolean stored in one byte
    Bool,
}

impl DataType {
    /// Every supported type
    pub const ALL: [DataType; 13] = [
        DataType::Float32,
        DataType::Float16,
        DataType::BFloat16,
        DataType::Float64,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::UInt8,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Bool,
    ];

    /// Size in bytes of a single element
    pub const fn size(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 | DataType::Bool => 1,
            DataType::Float16 | DataType::BFloat16 | DataType::Int16 | DataType::UInt16 => 2,
            DataType::Float32 | DataType::Int32 | DataType::UInt32 => 4,
            DataType::Float64 | DataType::Int64 | DataType::UInt64 => 8,
        }
    }

    /// Check if data type is floating point
    pub fn is_float(self) -> bool {
        matches!(
            self,
            DataType::Float32 | DataType::Float64 | DataType::Float16 | DataType::BFloat16
        )
    }

    /// Check if data type is integer
    pub fn is_int(self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }
}

/// Width of the widest supported element, the default arena alignment
pub const MAX_DTYPE_SIZE: usize = {
    let mut max = 0;
    let mut i = 0;
    while i < DataType::ALL.len() {
        let size = DataType::ALL[i].size();
        if size > max {
            max = size;
        }
        i += 1;
    }
    max
};

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Float32 => "Float32",
            DataType::Float16 => "Float16",
            DataType::BFloat16 => "BFloat16",
            DataType::Float64 => "Float64",
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::UInt8 => "UInt8",
            DataType::UInt16 => "UInt16",
            DataType::UInt32 => "UInt32",
            DataType::UInt64 => "UInt64",
            DataType::Bool => "Bool",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_size() {
        assert_eq!(DataType::Float32.size(), 4);
        assert_eq!(DataType::Int64.size(), 8);
        assert_eq!(DataType::UInt8.size(), 1);
        assert_eq!(DataType::Float64.size(), 8);
        assert_eq!(DataType::BFloat16.size(), 2);
    }

    #[test]
    fn test_max_dtype_size() {
        assert_eq!(MAX_DTYPE_SIZE, 8);
    }

    #[test]
    fn test_is_float() {
        assert!(DataType::Float32.is_float());
        assert!(DataType::Float64.is_float());
        assert!(!DataType::Int32.is_float());
    }

    #[test]
    fn test_is_int() {
        assert!(DataType::Int32.is_int());
        assert!(DataType::UInt8.is_int());
        assert!(!DataType::Float32.is_int());
        assert!(!DataType::Bool.is_int());
    }
}
