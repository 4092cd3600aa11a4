//! Quantization codecs for encoded samples and class accumulators.
//!
//! Every scheme maps zero-centred sums onto a small codebook and scales the
//! result back, so downstream cosine similarity sees values in the original
//! units:
//!
//! | Family    | Schemes                                        | Grid                                  |
//! |-----------|------------------------------------------------|---------------------------------------|
//! | Binarize  | `None`                                         | {0, 1} or {-1, +1}                    |
//! | Integer   | `INT8`, `INT4`, `INT2`                         | integers in `[-max_level, max_level]` |
//! | Offset    | `INT8_alt`, `INT4_alt`, `INT2_alt`             | half-integers, no zero level           |
//! | Minifloat | `FP8_E4M3`, `FP8_E5M2`, `FP6_E2M3`, `FP6_E3M2`, `FP4_E2M1` | OCP micro-scaling grids   |
//! | Table     | `FP4_E2M1_alt`                                 | fixed 14-entry codebook               |
//!
//! Integer and minifloat rounding is round-half-to-even, matching the
//! golden vectors the hardware is checked against. The zero-less grids
//! (offset and table) round midpoints away from zero so that `q(-x) == -q(x)`;
//! offset grids scale `±bound` onto their outer level `±(L + 0.5)`.

use crate::error::{HdcError, Result};
use crate::primitives::Primitives;
use crate::vector::Domain;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Overflow policy for minifloat formats that reserve a NaN encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    /// Clamp to the largest normal value.
    #[default]
    Sat,
    /// Map to NaN.
    Ovf,
}

/// Bit layout and range of a minifloat format.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinifloatFormat {
    pub exp_bits: u32,
    pub man_bits: u32,
    pub bias: i32,
    pub max_normal: f64,
    pub min_normal: f64,
    pub min_subnormal: f64,
    /// Reserved NaN bit pattern; `None` for formats that always saturate.
    pub nan_code: Option<u8>,
}

impl MinifloatFormat {
    pub const E4M3: Self = Self {
        exp_bits: 4,
        man_bits: 3,
        bias: 7,
        max_normal: 448.0,
        min_normal: 0.015625,         // 2^-6
        min_subnormal: 0.001953125,   // 2^-9
        nan_code: Some(0b0111_1111),
    };

    pub const E5M2: Self = Self {
        exp_bits: 5,
        man_bits: 2,
        bias: 15,
        max_normal: 57344.0,
        min_normal: 6.103515625e-5,   // 2^-14
        min_subnormal: 1.52587890625e-5, // 2^-16
        nan_code: Some(0b0111_1101),
    };

    pub const E2M3: Self = Self {
        exp_bits: 2,
        man_bits: 3,
        bias: 1,
        max_normal: 7.5,
        min_normal: 1.0,
        min_subnormal: 0.125,
        nan_code: None,
    };

    pub const E3M2: Self = Self {
        exp_bits: 3,
        man_bits: 2,
        bias: 3,
        max_normal: 28.0,
        min_normal: 0.25,
        min_subnormal: 0.0625,
        nan_code: None,
    };

    pub const E2M1: Self = Self {
        exp_bits: 2,
        man_bits: 1,
        bias: 1,
        max_normal: 6.0,
        min_normal: 1.0,
        min_subnormal: 0.5,
        nan_code: None,
    };

    /// Quantize one value onto the format's grid.
    ///
    /// Returns the representable value and its bit pattern
    /// (`sign | exponent | mantissa`). The input is narrowed to f32 first,
    /// like the reference vectors.
    pub fn quantize(&self, x: f64, overflow: Overflow) -> (f64, u8) {
        let x = x as f32 as f64;
        let sign_shift = self.exp_bits + self.man_bits;

        // Formats without a NaN code always saturate
        let overflow = match self.nan_code {
            Some(_) => overflow,
            None => Overflow::Sat,
        };

        if x.is_nan() {
            return match self.nan_code {
                Some(code) => (f64::NAN, code),
                None => (0.0, 0),
            };
        }

        let negative = x < 0.0;
        let sign_bit = u8::from(negative);
        let signed = |v: f64| if negative { -v } else { v };

        if x.abs() > self.max_normal {
            if let (Overflow::Ovf, Some(code)) = (overflow, self.nan_code) {
                return (f64::NAN, code);
            }
            return (signed(self.max_normal), self.max_code(sign_bit));
        }

        let a = x.abs();
        let man_scale = (1u32 << self.man_bits) as f64;

        if a >= self.min_normal {
            let mut exp = a.log2().floor() as i32;
            // Guard against log2 rounding at power-of-two boundaries
            if 2f64.powi(exp) > a {
                exp -= 1;
            } else if 2f64.powi(exp + 1) <= a {
                exp += 1;
            }
            let mant = a / 2f64.powi(exp) - 1.0;
            let mut m = (mant * man_scale).round_ties_even() as u32;
            let q = ((1.0 + m as f64 / man_scale) * 2f64.powi(exp)).min(self.max_normal);

            let mut e = exp + self.bias;
            if m == 1 << self.man_bits {
                m = 0;
                e += 1;
            }
            if q >= self.max_normal {
                return (signed(self.max_normal), self.max_code(sign_bit));
            }
            let code = (sign_bit << sign_shift) | ((e as u8) << self.man_bits) | m as u8;
            (signed(q), code)
        } else if a >= self.min_subnormal {
            let m = (a / self.min_normal * man_scale).round_ties_even() as u32;
            let q = m as f64 / man_scale * self.min_normal;
            // A subnormal that rounds up to 1.0 becomes the smallest normal
            let (e, m) = if m == 1 << self.man_bits { (1u8, 0u8) } else { (0u8, m as u8) };
            let code = (sign_bit << sign_shift) | (e << self.man_bits) | m;
            (signed(q), code)
        } else {
            (signed(0.0), sign_bit << sign_shift)
        }
    }

    fn max_code(&self, sign_bit: u8) -> u8 {
        let exp = self.max_normal.log2().floor() as i32;
        let m = ((self.max_normal / 2f64.powi(exp) - 1.0) * (1u32 << self.man_bits) as f64) as u8;
        let e = (exp + self.bias) as u8;
        (sign_bit << (self.exp_bits + self.man_bits)) | (e << self.man_bits) | m
    }
}

/// Hand-tuned non-uniform codebook for `FP4_E2M1_alt`. Symmetric about zero.
pub const FP4_E2M1_ALT_LEVELS: [f64; 14] = [
    -6.0, -4.0, -3.0, -2.0, -1.5, -1.0, -0.5, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 6.0,
];

/// Quantization scheme tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum QuantScheme {
    /// Plain binarization.
    #[default]
    None,
    Int8,
    Int4,
    Int2,
    Int8Alt,
    Int4Alt,
    Int2Alt,
    Fp8E4M3,
    Fp8E5M2,
    Fp6E2M3,
    Fp6E3M2,
    Fp4E2M1,
    Fp4E2M1Alt,
}

/// Codebook family of a scheme, with the parameters it quantizes by.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SchemeKind {
    Binarize,
    Integer { max_level: f64 },
    Offset { max_level: f64 },
    Minifloat(MinifloatFormat),
    Table(&'static [f64]),
}

impl QuantScheme {
    /// All schemes, in tag order.
    pub const ALL: [QuantScheme; 13] = [
        QuantScheme::None,
        QuantScheme::Int8,
        QuantScheme::Int4,
        QuantScheme::Int2,
        QuantScheme::Int8Alt,
        QuantScheme::Int4Alt,
        QuantScheme::Int2Alt,
        QuantScheme::Fp8E4M3,
        QuantScheme::Fp8E5M2,
        QuantScheme::Fp6E2M3,
        QuantScheme::Fp6E3M2,
        QuantScheme::Fp4E2M1,
        QuantScheme::Fp4E2M1Alt,
    ];

    pub fn kind(self) -> SchemeKind {
        match self {
            QuantScheme::None => SchemeKind::Binarize,
            QuantScheme::Int8 => SchemeKind::Integer { max_level: 127.0 },
            QuantScheme::Int4 => SchemeKind::Integer { max_level: 7.0 },
            QuantScheme::Int2 => SchemeKind::Integer { max_level: 1.0 },
            QuantScheme::Int8Alt => SchemeKind::Offset { max_level: 127.0 },
            QuantScheme::Int4Alt => SchemeKind::Offset { max_level: 7.0 },
            QuantScheme::Int2Alt => SchemeKind::Offset { max_level: 1.0 },
            QuantScheme::Fp8E4M3 => SchemeKind::Minifloat(MinifloatFormat::E4M3),
            QuantScheme::Fp8E5M2 => SchemeKind::Minifloat(MinifloatFormat::E5M2),
            QuantScheme::Fp6E2M3 => SchemeKind::Minifloat(MinifloatFormat::E2M3),
            QuantScheme::Fp6E3M2 => SchemeKind::Minifloat(MinifloatFormat::E3M2),
            QuantScheme::Fp4E2M1 => SchemeKind::Minifloat(MinifloatFormat::E2M1),
            QuantScheme::Fp4E2M1Alt => SchemeKind::Table(&FP4_E2M1_ALT_LEVELS),
        }
    }

    /// Largest magnitude on the scheme's grid before scaling.
    ///
    /// This is the divisor that maps the theoretical input range onto the grid.
    pub fn max_value(self) -> f64 {
        match self.kind() {
            SchemeKind::Binarize => 1.0,
            SchemeKind::Integer { max_level } => max_level,
            // Outermost half-integer level, so `±bound` lands on it
            SchemeKind::Offset { max_level } => max_level + 0.5,
            SchemeKind::Minifloat(fmt) => fmt.max_normal,
            SchemeKind::Table(levels) => levels.iter().fold(0.0, |m: f64, &l| m.max(l.abs())),
        }
    }

    /// Whether the grid has an exact zero.
    pub fn has_zero(self) -> bool {
        !matches!(self.kind(), SchemeKind::Offset { .. } | SchemeKind::Table(_))
    }

    pub fn tag(self) -> &'static str {
        match self {
            QuantScheme::None => "None",
            QuantScheme::Int8 => "INT8",
            QuantScheme::Int4 => "INT4",
            QuantScheme::Int2 => "INT2",
            QuantScheme::Int8Alt => "INT8_alt",
            QuantScheme::Int4Alt => "INT4_alt",
            QuantScheme::Int2Alt => "INT2_alt",
            QuantScheme::Fp8E4M3 => "FP8_E4M3",
            QuantScheme::Fp8E5M2 => "FP8_E5M2",
            QuantScheme::Fp6E2M3 => "FP6_E2M3",
            QuantScheme::Fp6E3M2 => "FP6_E3M2",
            QuantScheme::Fp4E2M1 => "FP4_E2M1",
            QuantScheme::Fp4E2M1Alt => "FP4_E2M1_alt",
        }
    }
}

impl fmt::Display for QuantScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for QuantScheme {
    type Err = HdcError;

    fn from_str(s: &str) -> Result<Self> {
        QuantScheme::ALL
            .iter()
            .copied()
            .find(|scheme| scheme.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| HdcError::InvalidQuantizationScheme(s.to_string()))
    }
}

impl Serialize for QuantScheme {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for QuantScheme {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// Quantized values on the scheme grid, before scaling back.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizedLevels {
    /// Grid values (integers, half-integers, minifloats or table entries).
    pub levels: Vec<f64>,
    /// Multiplier mapping grid values back to input units.
    pub scale: f64,
    /// Minifloat bit patterns, for minifloat schemes only.
    pub codes: Option<Vec<u8>>,
}

impl QuantizedLevels {
    /// Scale grid values back to input units.
    pub fn dequantize(&self) -> Vec<f64> {
        self.levels.iter().map(|&l| l * self.scale).collect()
    }
}

/// A quantized hypervector in input units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantizedVector {
    values: Vec<f64>,
    /// Largest magnitude any element can take at this vector's scale.
    max_q_val: f64,
}

impl QuantizedVector {
    pub fn new(values: Vec<f64>, max_q_val: f64) -> Self {
        Self { values, max_q_val }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn max_q_val(&self) -> f64 {
        self.max_q_val
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }
}

/// Applies one quantization scheme to accumulator sums.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Quantizer {
    scheme: QuantScheme,
    overflow: Overflow,
}

impl Quantizer {
    pub fn new(scheme: QuantScheme, overflow: Overflow) -> Self {
        Self { scheme, overflow }
    }

    /// Parse a scheme tag; unknown tags are rejected here, not per call.
    pub fn from_tag(tag: &str, overflow: Overflow) -> Result<Self> {
        Ok(Self::new(tag.parse()?, overflow))
    }

    pub fn scheme(&self) -> QuantScheme {
        self.scheme
    }

    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    /// Centre the sums on zero and return them with their theoretical bound.
    ///
    /// - sample, binary: `v - threshold`, bound `threshold`
    /// - sample, bipolar: `v`, bound `2 * threshold` (the term count)
    /// - class accumulator: `v`, bound `threshold` (count × `max_q_val`)
    pub fn center(values: &[f64], threshold: f64, domain: Domain, is_class_accumulator: bool) -> (Vec<f64>, f64) {
        if is_class_accumulator {
            return (values.to_vec(), threshold.abs());
        }
        match domain {
            Domain::Binary => (values.iter().map(|&v| v - threshold).collect(), threshold.abs()),
            Domain::Bipolar => (values.to_vec(), (2.0 * threshold).abs()),
        }
    }

    /// Quantize onto the scheme grid without scaling back.
    pub fn quantize_levels(
        &self,
        values: &[f64],
        threshold: f64,
        domain: Domain,
        is_class_accumulator: bool,
    ) -> QuantizedLevels {
        let kind = self.scheme.kind();
        if let SchemeKind::Binarize = kind {
            let threshold = if is_class_accumulator { 0.0 } else { threshold };
            let hv = Primitives::binarize(values, threshold, domain);
            return QuantizedLevels {
                levels: hv.to_f64(),
                scale: 1.0,
                codes: None,
            };
        }

        let (centered, bound) = Self::center(values, threshold, domain, is_class_accumulator);
        let mut scale = bound / self.scheme.max_value();
        if scale == 0.0 {
            scale = 1.0;
        }

        let mut codes = None;
        let levels = match kind {
            SchemeKind::Integer { max_level } => centered
                .iter()
                .map(|&v| (v / scale).round_ties_even().clamp(-max_level, max_level))
                .collect(),
            SchemeKind::Offset { max_level } => {
                let table = offset_levels(max_level);
                centered.iter().map(|&v| nearest_level(v / scale, &table)).collect()
            }
            SchemeKind::Table(table) => centered.iter().map(|&v| nearest_level(v / scale, table)).collect(),
            SchemeKind::Minifloat(fmt) => {
                let (levels, bits): (Vec<f64>, Vec<u8>) = centered
                    .iter()
                    .map(|&v| fmt.quantize(v / scale, self.overflow))
                    .unzip();
                codes = Some(bits);
                levels
            }
            SchemeKind::Binarize => centered,
        };

        QuantizedLevels { levels, scale, codes }
    }

    /// Quantize accumulator sums and scale them back to input units.
    ///
    /// `threshold` is the sample threshold (term count / 2) for encoded
    /// samples, or count × `max_q_val` for class accumulators.
    pub fn quantize(
        &self,
        values: &[f64],
        threshold: f64,
        domain: Domain,
        is_class_accumulator: bool,
    ) -> QuantizedVector {
        let q = self.quantize_levels(values, threshold, domain, is_class_accumulator);
        let max_q_val = self.scheme.max_value() * q.scale;
        QuantizedVector::new(q.dequantize(), max_q_val)
    }
}

/// Half-integer levels `-(L + 0.5) ..= L + 0.5` in unit steps.
fn offset_levels(max_level: f64) -> Vec<f64> {
    let top = max_level as i64;
    (-top - 1..=top).map(|i| i as f64 + 0.5).collect()
}

/// Closest level to `x` in a table symmetric about zero.
///
/// Matching is done on `|x|` and the sign of `x` (including the sign of
/// zero) is put back, so `q(-x) == -q(x)`. Ties go to the larger magnitude.
fn nearest_level(x: f64, levels: &[f64]) -> f64 {
    let a = x.abs();
    let mut best = f64::NAN;
    let mut best_dist = f64::INFINITY;
    for &level in levels.iter().filter(|&&l| l > 0.0) {
        let dist = (a - level).abs();
        if dist < best_dist || (dist == best_dist && level > best) {
            best = level;
            best_dist = dist;
        }
    }
    best.copysign(x)
}
