use std::fmt;
use std::ops::{Add, Neg, Sub};

use crate::tableau::Tableau;

/// One Big-M tableau cell: `constant + m·M` for an arbitrarily large
/// positive M. Comparison is lexicographic, penalty coefficient first, so
/// no concrete value of M is ever chosen.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MValue {
    /// Coefficient of the penalty unit M
    pub m: f64,
    /// Plain numeric part
    pub constant: f64,
}

impl MValue {
    pub fn new(m: f64, constant: f64) -> Self {
        Self { m, constant }
    }

    /// Strictly negative under lexicographic ordering, within tolerance.
    pub fn is_negative(&self, tolerance: f64) -> bool {
        self.m < -tolerance || (self.m.abs() <= tolerance && self.constant < -tolerance)
    }

    pub fn is_zero(&self, tolerance: f64) -> bool {
        self.m.abs() <= tolerance && self.constant.abs() <= tolerance
    }
}

impl Add for MValue {
    type Output = MValue;

    fn add(self, rhs: MValue) -> MValue {
        MValue::new(self.m + rhs.m, self.constant + rhs.constant)
    }
}

impl Sub for MValue {
    type Output = MValue;

    fn sub(self, rhs: MValue) -> MValue {
        MValue::new(self.m - rhs.m, self.constant - rhs.constant)
    }
}

impl Neg for MValue {
    type Output = MValue;

    fn neg(self) -> MValue {
        MValue::new(-self.m, -self.constant)
    }
}

impl fmt::Display for MValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.m == 0.0 {
            return write!(f, "{}", self.constant);
        }
        let m_part = if self.m == 1.0 {
            "M".to_string()
        } else if self.m == -1.0 {
            "-M".to_string()
        } else {
            format!("{}M", self.m)
        };
        if self.constant == 0.0 {
            write!(f, "{}", m_part)
        } else if self.m > 0.0 {
            write!(f, "{}+{}", self.constant, m_part)
        } else {
            write!(f, "{}{}", self.constant, m_part)
        }
    }
}

/// The paired Big-M state: two matrices of identical shape, one for plain
/// numeric coefficients and one for penalty-unit coefficients.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BigMTableau {
    pub(crate) numeric: Tableau,
    pub(crate) penalty: Tableau,
}

impl BigMTableau {
    pub(crate) fn cell(&self, row: usize, col: usize) -> MValue {
        MValue::new(self.penalty.value(row, col), self.numeric.value(row, col))
    }

    pub(crate) fn divide_row(&mut self, row: usize, divisor: f64) {
        self.numeric.divide_row(row, divisor);
        self.penalty.divide_row(row, divisor);
    }

    /// target_row -= (num_factor + pen_factor·M) * pivot_row.
    ///
    /// With pivot cells (p_num + p_pen·M) the M⁰ term is num_factor·p_num
    /// and the M¹ term is pen_factor·p_num + num_factor·p_pen; the M² term
    /// is dropped (pivot rows are constraint rows, whose penalty part is 0).
    pub(crate) fn eliminate(
        &mut self,
        target: usize,
        pivot_row: usize,
        num_factor: f64,
        pen_factor: f64,
    ) {
        for col in 0..self.numeric.width() {
            let p_num = self.numeric.value(pivot_row, col);
            let p_pen = self.penalty.value(pivot_row, col);
            let num = self.numeric.value(target, col) - num_factor * p_num;
            let pen = self.penalty.value(target, col) - pen_factor * p_num - num_factor * p_pen;
            self.numeric.set(target, col, num);
            self.penalty.set(target, col, pen);
        }
    }
}
