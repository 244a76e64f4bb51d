use std::cell::{Cell, RefCell};

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

use super::search::SearchResult;

/// Residual closure wrapped for the Levenberg-Marquardt solver, with a
/// forward-difference Jacobian and parameters clamped to their bounds.
struct FiniteDifferenceProblem<'a, F>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    residual: RefCell<F>,
    params: DVector<f64>,
    bounds: &'a [(f64, f64)],
    steps: &'a [f64],
    evaluations: Cell<usize>,
}

impl<F> FiniteDifferenceProblem<'_, F>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    fn eval(&self, p: &[f64]) -> Option<DVector<f64>> {
        self.evaluations.set(self.evaluations.get() + 1);
        let r = (self.residual.borrow_mut())(p);
        r.iter().all(|v| v.is_finite()).then(|| DVector::from_vec(r))
    }

    fn clamped(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            x.len(),
            x.iter()
                .zip(self.bounds)
                .map(|(&v, &(lo, hi))| v.clamp(lo, hi)),
        )
    }
}

impl<F> LeastSquaresProblem<f64, Dyn, Dyn> for FiniteDifferenceProblem<'_, F>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params = self.clamped(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.eval(self.params.as_slice())
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let base = self.eval(self.params.as_slice())?;
        let n = self.params.len();
        let mut jacobian = DMatrix::zeros(base.len(), n);
        for j in 0..n {
            let (lo, hi) = self.bounds[j];
            // Step backwards when the forward step would leave the bounds.
            let h = if self.params[j] + self.steps[j] <= hi {
                self.steps[j]
            } else {
                -self.steps[j]
            };
            let mut p = self.params.clone();
            p[j] = (p[j] + h).clamp(lo, hi);
            let shifted = self.eval(p.as_slice())?;
            jacobian.set_column(j, &((shifted - &base) / h));
        }
        Some(jacobian)
    }
}

/// Minimize `sum(residual(x)^2)` inside `bounds` with Levenberg-Marquardt.
///
/// `steps` are the forward-difference increments per parameter. The
/// returned value is `+inf` when the residual at the solution is not finite.
pub fn least_squares<F>(
    residual: F,
    x0: &[f64],
    bounds: &[(f64, f64)],
    steps: &[f64],
    patience: usize,
) -> SearchResult
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let problem = FiniteDifferenceProblem {
        residual: RefCell::new(residual),
        params: DVector::from_column_slice(x0),
        bounds,
        steps,
        evaluations: Cell::new(0),
    };

    let lm = LevenbergMarquardt::new().with_patience(patience.max(1));
    let (problem, _report) = lm.minimize(problem);

    let x = problem.params.as_slice().to_vec();
    let value = problem
        .eval(&x)
        .map(|r| r.norm_squared())
        .unwrap_or(f64::INFINITY);

    SearchResult {
        x,
        value,
        evaluations: problem.evaluations.get(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_linear_fit() {
        // y = 2x + 1 sampled exactly.
        let xs = [0.0, 1.0, 2.0, 3.0];
        let residual = |p: &[f64]| {
            xs.iter()
                .map(|&x| p[0] * x + p[1] - (2.0 * x + 1.0))
                .collect::<Vec<f64>>()
        };
        let bounds = [(-10.0, 10.0), (-10.0, 10.0)];
        let r = least_squares(residual, &[0.0, 0.0], &bounds, &[1e-6, 1e-6], 100);
        assert!((r.x[0] - 2.0).abs() < 1e-4, "{:?}", r);
        assert!((r.x[1] - 1.0).abs() < 1e-4, "{:?}", r);
        assert!(r.value < 1e-8);
    }

    #[test]
    fn non_finite_residual_is_infinite() {
        let r = least_squares(|_: &[f64]| vec![f64::NAN], &[0.0], &[(-1.0, 1.0)], &[0.1], 10);
        assert!(r.value.is_infinite());
        assert_eq!(r.x, vec![0.0]);
    }
}
