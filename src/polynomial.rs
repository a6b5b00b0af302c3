/// Local polynomial of one segment expressed in powers of the offset from the segment start:
/// `p(dt) = c0 + c1 * dt + c2 * dt^2 + ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPolynomial {
    coefficients: Vec<f64>,
}

impl SegmentPolynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        SegmentPolynomial { coefficients }
    }

    /// Taylor expansion around a knot: `value` at the knot and `derivatives[j]` being the
    /// `(j + 1)`-th derivative there.
    pub fn from_derivatives(value: f64, derivatives: &[f64]) -> Self {
        let mut coefficients = Vec::with_capacity(derivatives.len() + 1);
        coefficients.push(value);

        let mut factorial = 1.0;
        for (j, derivative) in derivatives.iter().enumerate() {
            factorial *= (j + 1) as f64;
            coefficients.push(derivative / factorial);
        }
        SegmentPolynomial { coefficients }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Highest power kept; an empty polynomial has order 0.
    pub fn order(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Copy keeping the terms up to and including `dt^order`.
    pub fn truncated(&self, order: usize) -> Self {
        let keep = (order + 1).min(self.coefficients.len());
        SegmentPolynomial { coefficients: self.coefficients[..keep].to_vec() }
    }

    pub fn evaluate(&self, dt: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |result, c| result * dt + c)
    }
}
