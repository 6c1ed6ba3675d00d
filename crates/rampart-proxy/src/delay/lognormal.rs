//! Log-normal delay distribution with quantile fitting.
//!
//! Draws are `exp(normal(mu, sigma)) * factor` milliseconds. The normal
//! draw uses the polar Box-Muller method. Parameters can be given directly
//! or fitted from a median and one further quantile; the fit runs a
//! coarse-to-fine grid search over sigma against a numerically integrated
//! CDF.

use rand::Rng;

const SQRT_TAU: f64 = 2.506_628_274_631_000_2; // sqrt(2 * pi)

/// Integration bands for the unit-median CDF. The density is steep near
/// the origin, so the first band is three orders of magnitude finer.
const CDF_BANDS: [(f64, f64, f64); 3] = [
    (0.0, 0.01, 1e-5),
    (0.01, 1.0, 1e-3),
    (1.0, f64::INFINITY, 1e-2),
];

#[derive(Debug, Clone, Copy)]
pub struct LogNormalDelay {
    mu: f64,
    sigma: f64,
    factor: f64,
}

impl LogNormalDelay {
    pub fn new(mu: f64, sigma: f64, factor: f64) -> Self {
        Self { mu, sigma, factor }
    }

    /// Fit from three points: the median value, a quantile level and the
    /// value at that quantile. The median fixes the linear factor (mu
    /// stays 0); sigma comes from the grid search.
    pub fn from_quantiles(median: f64, level: f64, value: f64) -> Self {
        assert!(median > 0.0 && value > 0.0, "quantile values must be positive");
        assert!(level > 0.0 && level < 1.0, "quantile level must be in (0, 1)");
        let sigma = fit_sigma(value / median, level);
        Self {
            mu: 0.0,
            sigma,
            factor: median,
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// One continuous draw.
    pub fn sample(&self) -> f64 {
        let normal = standard_normal(&mut rand::thread_rng());
        (self.mu + self.sigma * normal).exp() * self.factor
    }

    /// One draw rounded to whole milliseconds.
    pub fn sample_ms(&self) -> u64 {
        self.sample().max(0.0).round() as u64
    }

    /// Analytic probability density at `x`.
    pub fn density(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        let z = ((x / self.factor).ln() - self.mu) / self.sigma;
        (-0.5 * z * z).exp() / (x * self.sigma * SQRT_TAU)
    }
}

/// Polar Box-Muller: draw uniforms in (-1, 1) until their squared norm q
/// lands in (0, 1), then scale by sqrt(-2 ln(q) / q).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.gen_range(-1.0..1.0);
        let v: f64 = rng.gen_range(-1.0..1.0);
        let q = u * u + v * v;
        if q > 0.0 && q < 1.0 {
            return u * (-2.0 * q.ln() / q).sqrt();
        }
    }
}

/// Density of the unit-median log-normal (mu = 0, factor = 1).
fn unit_density(sigma: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let z = x.ln() / sigma;
    (-0.5 * z * z).exp() / (x * sigma * SQRT_TAU)
}

/// CDF of the unit-median log-normal by piecewise midpoint integration.
fn unit_cdf(sigma: f64, x: f64) -> f64 {
    let mut total = 0.0;
    for (lo, hi, step) in CDF_BANDS {
        if x <= lo {
            break;
        }
        let hi = hi.min(x);
        let mut t = lo;
        while t < hi {
            let width = step.min(hi - t);
            total += unit_density(sigma, t + width / 2.0) * width;
            t += width;
        }
    }
    total.min(1.0)
}

/// Grid search for sigma: three passes with steps 10, 1 and 0.1,
/// minimizing the squared deviation of the CDF at the median (level 0.5)
/// and at the target quantile.
fn fit_sigma(quantile_x: f64, quantile_level: f64) -> f64 {
    let error = |sigma: f64| {
        let at_median = unit_cdf(sigma, 1.0) - 0.5;
        let at_quantile = unit_cdf(sigma, quantile_x) - quantile_level;
        at_median * at_median + at_quantile * at_quantile
    };

    let mut best = 10.0;
    let mut best_error = error(best);
    let mut sigma = 20.0;
    while sigma <= 100.0 {
        let e = error(sigma);
        if e < best_error {
            best = sigma;
            best_error = e;
        }
        sigma += 10.0;
    }

    for step in [1.0, 0.1] {
        let hi = best + 10.0 * step;
        let mut sigma = (best - 10.0 * step).max(step);
        while sigma <= hi {
            let e = error(sigma);
            if e < best_error {
                best = sigma;
                best_error = e;
            }
            sigma += step;
        }
    }
    best
}
