/// Best point found by a search and what it cost to find it.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
}

/// Non-finite objective values rank as `+inf`.
fn finite_or_inf(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        f64::INFINITY
    }
}

/// `n` evenly spaced points over `[lo, hi]`, both ends included.
fn linspace(lo: f64, hi: f64, n: usize) -> impl Iterator<Item = f64> {
    let n = n.max(2);
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(move |i| if i + 1 == n { hi } else { lo + step * i as f64 })
}

/// Bounded 1D search: sample `coarse` points over `bounds`, then `fine`
/// points within one coarse spacing of the best.
///
/// Ties go to the point closest to `x0`.
pub fn grid_refine<F>(
    mut f: F,
    bounds: (f64, f64),
    coarse: usize,
    fine: usize,
    x0: f64,
) -> SearchResult
where
    F: FnMut(f64) -> f64,
{
    let (lo, hi) = bounds;
    let mut evaluations = 0;
    let mut best = (x0, f64::INFINITY);

    let mut consider = |x: f64, best: &mut (f64, f64)| {
        let v = finite_or_inf(f(x));
        evaluations += 1;
        let closer = (x - x0).abs() < (best.0 - x0).abs();
        if v < best.1 || (v == best.1 && closer) {
            *best = (x, v);
        }
    };

    for x in linspace(lo, hi, coarse) {
        consider(x, &mut best);
    }

    if best.1.is_finite() {
        let spacing = (hi - lo) / (coarse.max(2) - 1) as f64;
        let center = best.0;
        for x in linspace((center - spacing).max(lo), (center + spacing).min(hi), fine) {
            consider(x, &mut best);
        }
    }

    SearchResult {
        x: vec![best.0],
        value: best.1,
        evaluations,
    }
}

/// Golden-section search for the minimum of `f` on `[a, b]`.
///
/// Returns `(x_min, f_min, evaluations)`.
pub fn golden_section<F>(mut f: F, mut a: f64, mut b: f64, max_evals: usize) -> (f64, f64, usize)
where
    F: FnMut(f64) -> f64,
{
    const PHI: f64 = 1.618_033_988_749_895;
    const RESP: f64 = 2.0 - PHI;

    let mut x1 = a + RESP * (b - a);
    let mut x2 = b - RESP * (b - a);
    let mut f1 = finite_or_inf(f(x1));
    let mut f2 = finite_or_inf(f(x2));
    let mut evals = 2;

    while evals < max_evals && (b - a).abs() > 1e-12 {
        if f1 < f2 {
            b = x2;
            x2 = x1;
            f2 = f1;
            x1 = a + RESP * (b - a);
            f1 = finite_or_inf(f(x1));
        } else {
            a = x1;
            x1 = x2;
            f1 = f2;
            x2 = b - RESP * (b - a);
            f2 = finite_or_inf(f(x2));
        }
        evals += 1;
    }

    if f1 < f2 {
        (x1, f1, evals)
    } else {
        (x2, f2, evals)
    }
}

/// Range of `t` keeping `x + t d` inside `bounds`.
fn feasible_step(x: &[f64], d: &[f64], bounds: &[(f64, f64)]) -> (f64, f64) {
    let mut t_lo = f64::NEG_INFINITY;
    let mut t_hi = f64::INFINITY;
    for ((&xi, &di), &(lo, hi)) in x.iter().zip(d).zip(bounds) {
        if di.abs() < 1e-15 {
            continue;
        }
        let (a, b) = ((lo - xi) / di, (hi - xi) / di);
        t_lo = t_lo.max(a.min(b));
        t_hi = t_hi.min(a.max(b));
    }
    (t_lo, t_hi)
}

/// Powell's conjugate-direction method with bounded golden-section line
/// searches. `x0` must lie inside `bounds`.
pub fn powell<F>(
    mut f: F,
    x0: &[f64],
    bounds: &[(f64, f64)],
    max_iterations: usize,
    tolerance: f64,
) -> SearchResult
where
    F: FnMut(&[f64]) -> f64,
{
    const LINE_EVALS: usize = 30;
    let n = x0.len();
    let mut x = x0.to_vec();
    let mut fx = finite_or_inf(f(&x));
    let mut evaluations = 1;
    let mut directions: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let mut line_search = |x: &mut Vec<f64>, fx: &mut f64, d: &[f64], evaluations: &mut usize| {
        let (t_lo, t_hi) = feasible_step(x, d, bounds);
        if !(t_hi > t_lo) || !t_lo.is_finite() || !t_hi.is_finite() {
            return 0.0;
        }
        let base = x.clone();
        let (t, ft, used) = golden_section(
            |t| {
                let p: Vec<f64> = base.iter().zip(d).map(|(&b, &di)| b + t * di).collect();
                f(&p)
            },
            t_lo,
            t_hi,
            LINE_EVALS,
        );
        *evaluations += used;
        if ft < *fx {
            let gain = *fx - ft;
            for (xi, &di) in x.iter_mut().zip(d) {
                *xi += t * di;
            }
            *fx = ft;
            if gain.is_finite() {
                gain
            } else {
                f64::MAX
            }
        } else {
            0.0
        }
    };

    for _ in 0..max_iterations {
        let start = x.clone();
        let f_start = fx;
        let mut biggest = (0usize, 0.0);

        for (i, d) in directions.iter().enumerate() {
            let gain = line_search(&mut x, &mut fx, d.as_slice(), &mut evaluations);
            if gain > biggest.1 {
                biggest = (i, gain);
            }
        }

        let converged =
            2.0 * (f_start - fx) <= tolerance * (f_start.abs() + fx.abs()) + 1e-20;
        if f_start.is_finite() && converged {
            break;
        }
        if !fx.is_finite() {
            break;
        }

        let step: Vec<f64> = x.iter().zip(&start).map(|(&a, &b)| a - b).collect();
        if step.iter().any(|s| s.abs() > 0.0) {
            line_search(&mut x, &mut fx, step.as_slice(), &mut evaluations);
            directions.remove(biggest.0);
            directions.push(step);
        }
    }

    SearchResult {
        x,
        value: fx,
        evaluations,
    }
}
