//! Error types for the HDC reference model.

use thiserror::Error;

/// Errors surfaced by configuration, generation and persistence.
///
/// Numeric degeneracies (zero norm, zero count, zero scale) are never
/// reported here; they resolve to fixed fallback constants.
#[derive(Error, Debug)]
pub enum HdcError {
    /// Operands of an elementwise operation have different lengths
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Iterative CA90 expansion needs the seed length to divide the target
    #[error("Target dimension {target} is not divisible by seed length {seed_len}")]
    NonDivisibleDimension { target: usize, seed_len: usize },

    /// Hierarchical CA90 expansion cannot reach the target by doubling
    #[error("Target dimension {target} is not reachable by doubling seed length {seed_len}")]
    UnreachableDimension { target: usize, seed_len: usize },

    /// Seed search hit its attempt cap before finding enough seeds
    #[error("Seed search exhausted after {attempts} attempts ({found}/{requested} seeds found)")]
    SeedSearchExhausted {
        attempts: usize,
        found: usize,
        requested: usize,
    },

    /// Item memory bank is too large for the dimension (strict mode only)
    #[error("Item memory bank of {per_bank} vectors saturates a {dim}-dimensional memory")]
    BankSizeExceeded { per_bank: usize, dim: usize },

    /// Unknown quantization scheme tag
    #[error("Invalid quantization scheme: {0}")]
    InvalidQuantizationScheme(String),

    /// Seed size outside 1..=64 bits
    #[error("Invalid seed size: {0} bits")]
    InvalidSeedSize(usize),

    /// Accumulator would exceed its exact-count capacity
    #[error("Accumulator capacity of {capacity} bundled terms exceeded")]
    AccumulatorOverflow { capacity: u64 },

    /// Item memory or CIM lookup past the end
    #[error("Index {index} out of range for memory of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Empty input where non-empty was required
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Malformed persisted memory
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// I/O error from persistence helpers
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for HDC operations.
pub type Result<T> = std::result::Result<T, HdcError>;
