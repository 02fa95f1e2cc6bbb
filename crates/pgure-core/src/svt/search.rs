use crate::consts::GOLDEN_RATIO_CONJUGATE;

use super::LambdaSearch;

/// Budgeted objective wrapper that remembers the best point seen.
struct Evaluator<F> {
    objective: F,
    remaining: usize,
    used: usize,
    best: Option<(f64, f64)>,
}

impl<F: FnMut(f64) -> f64> Evaluator<F> {
    fn eval(&mut self, x: f64) -> Option<f64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.used += 1;
        let fx = (self.objective)(x);
        let better = match self.best {
            None => true,
            Some((_, best)) => fx < best || best.is_nan(),
        };
        if better {
            self.best = Some((x, fx));
        }
        Some(fx)
    }

    fn finish(self, fallback: f64, converged: bool) -> LambdaSearch {
        LambdaSearch {
            lambda: self.best.map_or(fallback, |(x, _)| x),
            evaluations: self.used,
            converged,
        }
    }
}

/// Minimise a one-dimensional objective on `[lower, upper]`.
///
/// Starts at `initial`, walks downhill with a doubling step until the
/// minimum is bracketed, then narrows the bracket by golden-section search
/// until its width falls below `tolerance * (upper - lower)`. At most
/// `max_evaluations` objective calls are made; when the budget runs out the
/// best point seen so far is returned with `converged == false`. A zero
/// budget returns `initial` untouched.
pub fn minimize_scalar<F>(
    objective: F,
    initial: f64,
    lower: f64,
    upper: f64,
    tolerance: f64,
    max_evaluations: usize,
) -> LambdaSearch
where
    F: FnMut(f64) -> f64,
{
    if max_evaluations == 0 {
        return LambdaSearch {
            lambda: initial,
            evaluations: 0,
            converged: false,
        };
    }
    let mut ev = Evaluator {
        objective,
        remaining: max_evaluations,
        used: 0,
        best: None,
    };

    if upper.partial_cmp(&lower) != Some(std::cmp::Ordering::Greater) {
        let _ = ev.eval(lower);
        return ev.finish(lower, true);
    }

    let x0 = if initial.is_finite() {
        initial.clamp(lower, upper)
    } else {
        0.5 * (lower + upper)
    };
    let span = upper - lower;
    let min_width = tolerance.max(0.0) * span;

    let Some(f0) = ev.eval(x0) else {
        return ev.finish(x0, false);
    };

    // Bracket: walk downhill from x0 until the objective rises or a bound is hit.
    let mut step = (0.5 * x0.abs()).max(0.05 * span);
    let right = (x0 + step).min(upper);
    let Some(f_right) = ev.eval(right) else {
        return ev.finish(x0, false);
    };
    let ascending = right > x0 && f_right < f0;
    let bound = if ascending { upper } else { lower };
    // `prev` is the last point known to be no lower than `cur`.
    let (mut prev, mut cur, mut f_cur) = if ascending {
        (x0, right, f_right)
    } else {
        (right, x0, f0)
    };
    let (a, b) = loop {
        if cur == bound {
            break (prev.min(bound), prev.max(bound));
        }
        step *= 2.0;
        let next = if ascending {
            (cur + step).min(upper)
        } else {
            (cur - step).max(lower)
        };
        let Some(f_next) = ev.eval(next) else {
            return ev.finish(x0, false);
        };
        if f_next >= f_cur {
            break (prev.min(next), prev.max(next));
        }
        prev = cur;
        cur = next;
        f_cur = f_next;
    };

    // Golden-section refinement of [a, b].
    let (mut a, mut b) = (a, b);
    let mut c = b - GOLDEN_RATIO_CONJUGATE * (b - a);
    let mut d = a + GOLDEN_RATIO_CONJUGATE * (b - a);
    let Some(mut fc) = ev.eval(c) else {
        return ev.finish(x0, false);
    };
    let Some(mut fd) = ev.eval(d) else {
        return ev.finish(x0, false);
    };
    while b - a > min_width {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - GOLDEN_RATIO_CONJUGATE * (b - a);
            match ev.eval(c) {
                Some(f) => fc = f,
                None => return ev.finish(x0, false),
            }
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + GOLDEN_RATIO_CONJUGATE * (b - a);
            match ev.eval(d) {
                Some(f) => fd = f,
                None => return ev.finish(x0, false),
            }
        }
        if b - a <= f64::EPSILON * span {
            break;
        }
    }
    ev.finish(x0, true)
}
