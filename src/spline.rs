use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Polynomial degree of every spline piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplineMode {
    Linear = 1,
    Quadratic = 2,
    Cubic = 3,
}

impl SplineMode {
    pub fn degree(&self) -> usize {
        *self as usize
    }
}

impl TryFrom<usize> for SplineMode {
    type Error = SplineError;

    fn try_from(degree: usize) -> Result<Self, Self::Error> {
        match degree {
            1 => Ok(SplineMode::Linear),
            2 => Ok(SplineMode::Quadratic),
            3 => Ok(SplineMode::Cubic),
            other => Err(SplineError::UnsupportedMode(other)),
        }
    }
}

/// Spline in B-spline representation: full knot vector `t`, coefficients `c` and degree `k`,
/// with `t.len() == c.len() + k + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BSpline {
    knots: Vec<f64>,
    coefficients: Vec<f64>,
    degree: usize,
}

impl BSpline {
    /// Builds the interpolating spline of degree `mode` through `(x, y)`.
    ///
    /// Knot placement follows the FITPACK interpolation convention: boundary knots are repeated
    /// `k + 1` times, interior knots sit on the data abscissae for odd degrees (not-a-knot for
    /// cubics) and halfway between them for even degrees.
    /// # Example
    /// ```
    /// use dac_spline::{BSpline, SplineMode};
    /// use assert_approx_eq::assert_approx_eq;
    ///
    /// let spline = BSpline::interpolate(&[0.0, 2.0, 4.0], &[1.0, 4.0, 16.0], SplineMode::Linear).unwrap();
    ///
    /// assert_approx_eq!(2.5, spline.evaluate(1.0), 1e-12);
    /// assert_approx_eq!(6.0, spline.evaluate_derivative(2.0, 1), 1e-12);
    /// ```
    /// # Errors
    /// Error is returned when lengths differ, fewer than `k + 1` points are given, abscissae
    /// are not strictly increasing or the collocation system is singular.
    pub fn interpolate(x: &[f64], y: &[f64], mode: SplineMode) -> Result<Self, SplineError> {
        let degree = mode.degree();

        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch(x.len(), y.len()));
        }
        if x.len() < degree + 1 {
            return Err(SplineError::InsufficientPoints { degree, required: degree + 1, provided: x.len() });
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SplineError::NonFinite);
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SplineError::NotIncreasing);
        }

        let knots = Self::calculate_knot_vector(x, degree);
        let mut spline = BSpline { knots, coefficients: vec![0.0; x.len()], degree };
        spline.calculate_coefficients(x, y)?;
        Ok(spline)
    }

    /// Creates [BSpline] from an explicit knot vector and coefficients.
    /// # Errors
    /// Error is returned when the knot count does not equal `coefficients.len() + degree + 1`,
    /// there are fewer than `degree + 1` coefficients or knots decrease.
    pub fn new(knots: Vec<f64>, coefficients: Vec<f64>, degree: usize) -> Result<Self, SplineError> {
        if coefficients.len() < degree + 1 {
            return Err(SplineError::InsufficientPoints {
                degree,
                required: degree + 1,
                provided: coefficients.len(),
            });
        }
        if knots.len() != coefficients.len() + degree + 1 {
            return Err(SplineError::InvalidKnotVector(format!(
                "expected {} knots for {} coefficients of degree {}, got {}",
                coefficients.len() + degree + 1,
                coefficients.len(),
                degree,
                knots.len()
            )));
        }
        if knots.windows(2).any(|w| w[1] < w[0]) {
            return Err(SplineError::InvalidKnotVector("knots must be non-decreasing".to_string()));
        }
        if knots[degree + 1] <= knots[degree] {
            return Err(SplineError::InvalidKnotVector("first interval has zero width".to_string()));
        }

        Ok(BSpline { knots, coefficients, degree })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Start and end of the interval the spline was fitted on.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.knots.len() - self.degree - 1])
    }

    /// Value at `x`. Outside [BSpline::domain] the end pieces are extrapolated.
    pub fn evaluate(&self, x: f64) -> f64 {
        let interval = self.find_interval_index(x);
        self.de_boor(interval, x)
    }

    pub fn batch_evaluate(&self, x_vector: &[f64]) -> Vec<f64> {
        let mut results = Vec::with_capacity(x_vector.len());
        let mut index = self.degree;

        for x in x_vector {
            index = self.find_interval_index_with_hint(index, *x);
            results.push(self.de_boor(index, *x));
        }
        results
    }

    /// Spline of degree `k - 1` equal to the first derivative, or `None` for a piecewise
    /// constant spline.
    pub fn derivative(&self) -> Option<BSpline> {
        if self.degree == 0 {
            return None;
        }

        let k = self.degree;
        let coefficients = self
            .coefficients
            .windows(2)
            .enumerate()
            .map(|(i, c)| {
                let span = self.knots[i + k + 1] - self.knots[i + 1];
                if span > 0.0 {
                    k as f64 * (c[1] - c[0]) / span
                } else {
                    0.0
                }
            })
            .collect();
        let knots = self.knots[1..self.knots.len() - 1].to_vec();

        Some(BSpline { knots, coefficients, degree: k - 1 })
    }

    /// Derivative of the given order at `x`; orders above the degree are 0.
    pub fn evaluate_derivative(&self, x: f64, order: usize) -> f64 {
        if order == 0 {
            return self.evaluate(x);
        }
        if order > self.degree {
            return 0.0;
        }

        self.nth_derivative(order).map_or(0.0, |spline| spline.evaluate(x))
    }

    /// Derivative of the given order at every point of `x_vector`.
    pub fn batch_evaluate_derivative(&self, x_vector: &[f64], order: usize) -> Vec<f64> {
        if order == 0 {
            return self.batch_evaluate(x_vector);
        }
        if order > self.degree {
            return vec![0.0; x_vector.len()];
        }

        match self.nth_derivative(order) {
            Some(spline) => spline.batch_evaluate(x_vector),
            None => vec![0.0; x_vector.len()],
        }
    }

    fn nth_derivative(&self, order: usize) -> Option<BSpline> {
        let mut derivative = self.derivative();
        for _ in 1..order {
            derivative = derivative.and_then(|spline| spline.derivative());
        }
        derivative
    }

    fn calculate_knot_vector(x: &[f64], degree: usize) -> Vec<f64> {
        let m = x.len();
        let mut knots = Vec::with_capacity(m + degree + 1);

        knots.extend(std::iter::repeat(x[0]).take(degree + 1));
        if degree % 2 == 1 {
            let offset = (degree + 1) / 2;
            knots.extend_from_slice(&x[offset..m - offset]);
        } else {
            let offset = degree / 2;
            knots.extend(x[offset..m - offset].windows(2).map(|w| 0.5 * (w[0] + w[1])));
        }
        knots.extend(std::iter::repeat(x[m - 1]).take(degree + 1));

        knots
    }

    // Row i of the collocation matrix is non-zero only on columns start[i]..=start[i] + k and
    // the starts never decrease, so the system is stored as an m x (k + 1) band. The matrix is
    // totally positive, so elimination needs no pivoting and fill-in stays inside each row band.
    fn calculate_coefficients(&mut self, x: &[f64], y: &[f64]) -> Result<(), SplineError> {
        let size = x.len();
        let k = self.degree;
        let mut band = DMatrix::<f64>::zeros(size, k + 1);
        let mut rhs = DVector::<f64>::from_column_slice(y);
        let mut row_start = Vec::with_capacity(size);

        for (row, x_value) in x.iter().enumerate() {
            let interval = self.find_interval_index(*x_value);
            let basis = self.basis_functions(interval, *x_value);
            for (r, value) in basis.iter().enumerate() {
                band[(row, r)] = *value;
            }
            row_start.push(interval - k);
        }

        for column in 0..size {
            if column < row_start[column] || column > row_start[column] + k {
                return Err(SplineError::SingularSystem);
            }
            let pivot = band[(column, column - row_start[column])];
            if pivot == 0.0 || !pivot.is_finite() {
                return Err(SplineError::SingularSystem);
            }
            let pivot_end = row_start[column] + k;

            let mut row = column + 1;
            while row < size && row_start[row] <= column {
                let factor = band[(row, column - row_start[row])] / pivot;
                if factor != 0.0 {
                    for c in column..=pivot_end {
                        let update = factor * band[(column, c - row_start[column])];
                        band[(row, c - row_start[row])] -= update;
                    }
                    let update = factor * rhs[column];
                    rhs[row] -= update;
                }
                row += 1;
            }
        }

        let mut solution = vec![0.0; size];
        for column in (0..size).rev() {
            let start = row_start[column];
            let tail: f64 = (column + 1..=start + k)
                .map(|c| band[(column, c - start)] * solution[c])
                .sum();
            solution[column] = (rhs[column] - tail) / band[(column, column - start)];
        }

        self.coefficients = solution;
        Ok(())
    }

    /// Values of the `k + 1` basis functions that are non-zero on interval `interval`,
    /// the `r`-th belonging to coefficient `interval - k + r`.
    fn basis_functions(&self, interval: usize, x: f64) -> Vec<f64> {
        let k = self.degree;
        let mut basis = vec![0.0; k + 1];
        let mut left = vec![0.0; k + 1];
        let mut right = vec![0.0; k + 1];
        basis[0] = 1.0;

        for j in 1..=k {
            left[j] = x - self.knots[interval + 1 - j];
            right[j] = self.knots[interval + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let denominator = right[r + 1] + left[j - r];
                let temp = if denominator != 0.0 { basis[r] / denominator } else { 0.0 };
                basis[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            basis[j] = saved;
        }
        basis
    }

    fn de_boor(&self, interval: usize, x: f64) -> f64 {
        let k = self.degree;
        let mut d: Vec<f64> = (0..=k).map(|j| self.coefficients[j + interval - k]).collect();

        for r in 1..=k {
            for j in (r..=k).rev() {
                let left = self.knots[j + interval - k];
                let right = self.knots[j + 1 + interval - r];
                let alpha = if right > left { (x - left) / (right - left) } else { 0.0 };
                d[j] = (1.0 - alpha) * d[j - 1] + alpha * d[j];
            }
        }
        d[k]
    }

    fn first_interval(&self) -> usize {
        self.degree
    }

    fn last_interval(&self) -> usize {
        self.knots.len() - self.degree - 2
    }

    // Largest l with t[l] <= x < t[l + 1], clamped to the first and last piece.
    fn find_interval_index(&self, x: f64) -> usize {
        let mut min = self.first_interval();
        let mut max = self.last_interval() + 1;

        while max - min > 1 {
            let mid = (min + max) / 2;
            if x < self.knots[mid] {
                max = mid;
            } else {
                min = mid;
            }
        }
        min
    }

    fn find_interval_index_with_hint(&self, index_hint: usize, x: f64) -> usize {
        if !self.is_in_interval_range(index_hint, x) {
            if index_hint < self.last_interval() && self.is_in_interval_range(index_hint + 1, x) {
                return index_hint + 1;
            } else {
                return self.find_interval_index(x);
            }
        }
        index_hint
    }

    fn is_in_interval_range(&self, interval: usize, x: f64) -> bool {
        let above_start = interval == self.first_interval() || self.knots[interval] <= x;
        let below_end = interval == self.last_interval() || x < self.knots[interval + 1];
        above_start && below_end
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SplineError {
    #[error("unsupported spline mode {0}, expected 1, 2 or 3")]
    UnsupportedMode(usize),

    #[error("x and y differ in length: {0} != {1}")]
    LengthMismatch(usize, usize),

    #[error("degree {degree} spline needs at least {required} points, got {provided}")]
    InsufficientPoints { degree: usize, required: usize, provided: usize },

    #[error("spline input contains a non-finite value")]
    NonFinite,

    #[error("spline abscissae must be strictly increasing")]
    NotIncreasing,

    #[error("invalid knot vector: {0}")]
    InvalidKnotVector(String),

    #[error("collocation system is singular")]
    SingularSystem,
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use rand::Rng;

    use super::*;

    #[test]
    fn mode_from_degree() {
        assert_eq!(Ok(SplineMode::Linear), SplineMode::try_from(1usize));
        assert_eq!(Ok(SplineMode::Quadratic), SplineMode::try_from(2usize));
        assert_eq!(Ok(SplineMode::Cubic), SplineMode::try_from(3usize));
        assert_eq!(Err(SplineError::UnsupportedMode(0)), SplineMode::try_from(0usize));
        assert_eq!(Err(SplineError::UnsupportedMode(4)), SplineMode::try_from(4usize));
    }

    #[test]
    fn knot_vector_linear() {
        let knots = BSpline::calculate_knot_vector(&[0.0, 1.0, 2.0, 3.0], 1);
        assert_eq!(knots, vec![0.0, 0.0, 1.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn knot_vector_quadratic_uses_midpoints() {
        let knots = BSpline::calculate_knot_vector(&[0.0, 1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(knots, vec![0.0, 0.0, 0.0, 1.5, 2.5, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn knot_vector_cubic_is_not_a_knot() {
        let knots = BSpline::calculate_knot_vector(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(knots, vec![0.0, 0.0, 0.0, 0.0, 2.0, 3.0, 5.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn linear_through_three_points() {
        let eps = 1e-12;
        let spline = BSpline::interpolate(&[0.0, 2.0, 4.0], &[1.0, 4.0, 16.0], SplineMode::Linear).unwrap();

        assert_eq!(spline.coefficients(), &[1.0, 4.0, 16.0]);
        assert_approx_eq!(spline.evaluate(0.0), 1.0, eps);
        assert_approx_eq!(spline.evaluate(1.0), 2.5, eps);
        assert_approx_eq!(spline.evaluate(3.0), 10.0, eps);
        assert_approx_eq!(spline.evaluate(4.0), 16.0, eps);

        let slopes = spline.batch_evaluate_derivative(&[0.0, 2.0, 4.0], 1);
        assert_approx_eq!(slopes[0], 1.5, eps);
        assert_approx_eq!(slopes[1], 6.0, eps);
        assert_approx_eq!(slopes[2], 6.0, eps);
    }

    #[test]
    fn linear_extrapolates_end_pieces() {
        let eps = 1e-12;
        let spline = BSpline::interpolate(&[0.0, 2.0, 4.0], &[1.0, 4.0, 16.0], SplineMode::Linear).unwrap();

        assert_approx_eq!(spline.evaluate(-2.0), -2.0, eps);
        assert_approx_eq!(spline.evaluate(5.0), 22.0, eps);
    }

    #[test]
    fn quadratic_reproduces_parabola() {
        let eps = 1e-9;
        let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v - 2.0 * v).collect();
        let spline = BSpline::interpolate(&x, &y, SplineMode::Quadratic).unwrap();

        for t in [0.0, 0.3, 1.7, 2.5, 4.9, 5.0] {
            assert_approx_eq!(spline.evaluate(t), t * t - 2.0 * t, eps);
            assert_approx_eq!(spline.evaluate_derivative(t, 1), 2.0 * t - 2.0, eps);
            assert_approx_eq!(spline.evaluate_derivative(t, 2), 2.0, eps);
        }
        assert_eq!(spline.evaluate_derivative(1.0, 3), 0.0);
    }

    #[test]
    fn cubic_reproduces_cubic() {
        let eps = 1e-8;
        let x: Vec<f64> = vec![0.0, 0.5, 1.25, 2.0, 3.0, 3.5, 5.0];
        let y: Vec<f64> = x.iter().map(|v| v.powi(3) - v).collect();
        let spline = BSpline::interpolate(&x, &y, SplineMode::Cubic).unwrap();

        for t in [0.0, 0.7, 1.25, 2.6, 4.2, 5.0] {
            assert_approx_eq!(spline.evaluate(t), t.powi(3) - t, eps);
            assert_approx_eq!(spline.evaluate_derivative(t, 1), 3.0 * t * t - 1.0, eps);
            assert_approx_eq!(spline.evaluate_derivative(t, 2), 6.0 * t, eps);
            assert_approx_eq!(spline.evaluate_derivative(t, 3), 6.0, eps);
        }
    }

    #[test]
    fn cubic_with_minimal_points() {
        let eps = 1e-9;
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 0.0, 3.0, 2.0];
        let spline = BSpline::interpolate(&x, &y, SplineMode::Cubic).unwrap();

        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_approx_eq!(spline.evaluate(*xi), *yi, eps);
        }
    }

    #[test]
    fn derivative_lowers_degree() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let spline = BSpline::interpolate(&x, &[0.0, 1.0, 8.0, 27.0], SplineMode::Cubic).unwrap();
        let derivative = spline.derivative().unwrap();

        assert_eq!(2, derivative.degree());
        assert_eq!(spline.knots().len() - 2, derivative.knots().len());
        assert_eq!(spline.coefficients().len() - 1, derivative.coefficients().len());
    }

    #[test]
    fn batch_matches_single_evaluation() {
        let x: Vec<f64> = (0..10).map(|i| (i as f64).sqrt()).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let spline = BSpline::interpolate(&x, &y, SplineMode::Cubic).unwrap();

        let points: Vec<f64> = (0..=90).map(|i| -0.1 + i as f64 * 0.035).collect();
        let batch = spline.batch_evaluate(&points);

        for (p, b) in points.iter().zip(batch.iter()) {
            assert_approx_eq!(spline.evaluate(*p), *b, 1e-12);
        }
    }

    #[test]
    fn linear_is_exact_at_random_knots() {
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let count = rng.gen_range(2..60);
            let mut x = Vec::with_capacity(count);
            let mut t = rng.gen_range(-5.0..5.0);
            for _ in 0..count {
                x.push(t);
                t += rng.gen_range(1e-3..2.0);
            }
            let y: Vec<f64> = (0..count).map(|_| rng.gen_range(-10.0..10.0)).collect();

            let spline = BSpline::interpolate(&x, &y, SplineMode::Linear).unwrap();
            let values = spline.batch_evaluate(&x);

            for (value, expected) in values.iter().zip(y.iter()) {
                assert_approx_eq!(*value, *expected, 1e-9);
            }
        }
    }

    #[test]
    fn fit_through_many_knots() {
        let count = 20_000;
        let x: Vec<f64> = (0..count).map(|i| i as f64 * 0.0005).collect();
        let y: Vec<f64> = x.iter().map(|v| (v * 0.23).exp() + v.sin()).collect();

        for mode in [SplineMode::Linear, SplineMode::Quadratic, SplineMode::Cubic] {
            let spline = BSpline::interpolate(&x, &y, mode).unwrap();
            let values = spline.batch_evaluate(&x);

            assert_eq!(count, spline.coefficients().len());
            for (value, expected) in values.iter().zip(y.iter()) {
                assert_approx_eq!(*value, *expected, 1e-8);
            }
        }
    }

    #[test]
    fn insufficient_points() {
        let spline = BSpline::interpolate(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], SplineMode::Cubic);
        assert_eq!(
            spline,
            Err(SplineError::InsufficientPoints { degree: 3, required: 4, provided: 3 })
        );
        assert!(BSpline::interpolate(&[0.0], &[0.0], SplineMode::Linear).is_err());
    }

    #[test]
    fn mismatched_lengths() {
        let spline = BSpline::interpolate(&[0.0, 1.0, 2.0], &[0.0, 1.0], SplineMode::Linear);
        assert_eq!(spline, Err(SplineError::LengthMismatch(3, 2)));
    }

    #[test]
    fn equal_x_values() {
        let spline = BSpline::interpolate(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0], SplineMode::Linear);
        assert_eq!(spline, Err(SplineError::NotIncreasing));
    }

    #[test]
    fn new_validates_knot_count() {
        assert!(BSpline::new(vec![0.0, 0.0, 1.0, 1.0], vec![1.0, 2.0], 1).is_ok());
        assert!(BSpline::new(vec![0.0, 0.0, 1.0], vec![1.0, 2.0], 1).is_err());
        assert!(BSpline::new(vec![0.0, 0.0, 0.0, 0.0], vec![1.0, 2.0], 1).is_err());
    }
}
