//! Monte Carlo estimate of the maximum-drawdown distribution.
//!
//! Synthetic change sequences are drawn from the observed changes, either
//! element by element (i.i.d.) or as contiguous windows of `2 * w` changes so
//! that short-range serial dependence survives the resampling. Each synthetic
//! sequence is reduced to its max drawdown; the report summarises the
//! distribution of those values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::EngineError;
use super::statistics::maxdd;

pub const DEFAULT_RUNS: usize = 5000;
pub const DEFAULT_QUANTILES: [f64; 3] = [0.75, 0.9, 0.975];

// Cunnane plotting positions.
const ALPHAP: f64 = 0.4;
const BETAP: f64 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloConfig {
    /// Number of synthetic sequences.
    pub runs: usize,
    /// Target synthetic length; `None` uses the input length.
    pub length: Option<usize>,
    /// Half-width `w` of the resampled windows; `None` or `Some(0)` draws i.i.d.
    pub serial_dependence: Option<usize>,
    pub quantiles: Vec<f64>,
    /// Seed for the generator built by [`MonteCarloConfig::rng`]; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        MonteCarloConfig {
            runs: DEFAULT_RUNS,
            length: None,
            serial_dependence: None,
            quantiles: DEFAULT_QUANTILES.to_vec(),
            seed: None,
        }
    }
}

impl MonteCarloConfig {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn scheme(&self) -> ResampleScheme {
        match self.serial_dependence {
            None | Some(0) => ResampleScheme::Iid,
            Some(half_width) => ResampleScheme::Windowed { half_width },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleScheme {
    Iid,
    Windowed { half_width: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloReport {
    /// One max drawdown per run, in draw order.
    pub samples: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation of `samples`.
    pub sd: f64,
    /// `(level, value)` pairs in the order the levels were requested.
    pub quantiles: Vec<(f64, f64)>,
}

impl MonteCarloReport {
    pub fn quantile(&self, level: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|(l, _)| (*l - level).abs() < 1e-12)
            .map(|(_, v)| *v)
    }
}

/// Run the resampler with a caller-supplied generator.
pub fn maxdd_montecarlo<R: Rng + ?Sized>(
    changes: &[f64],
    config: &MonteCarloConfig,
    rng: &mut R,
) -> Result<MonteCarloReport, EngineError> {
    if changes.is_empty() {
        return Err(EngineError::EmptyData {
            what: "maxdd_montecarlo".into(),
        });
    }
    if config.runs == 0 {
        return Err(EngineError::InvalidParameter {
            name: "runs".into(),
            reason: "must be at least 1".into(),
        });
    }
    if let Some(q) = config
        .quantiles
        .iter()
        .find(|q| !(0.0..=1.0).contains(*q))
    {
        return Err(EngineError::InvalidParameter {
            name: "quantiles".into(),
            reason: format!("level {q} outside [0, 1]"),
        });
    }

    let scheme = config.scheme();
    ensure_window_fits(changes, scheme)?;

    let length = config.length.unwrap_or(changes.len());
    tracing::info!(runs = config.runs, length, ?scheme, "sampling max drawdowns");

    let samples = (0..config.runs)
        .map(|_| resample(changes, scheme, length, rng).map(|seq| maxdd(&seq)))
        .collect::<Result<Vec<f64>, EngineError>>()?;

    let (mean, sd) = mean_and_sd(&samples);

    let mut sorted = samples.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let quantiles = config
        .quantiles
        .iter()
        .map(|&p| (p, mquantile(&sorted, p)))
        .collect();

    Ok(MonteCarloReport {
        samples,
        mean,
        sd,
        quantiles,
    })
}

/// Draw one synthetic sequence of at least `length` changes.
///
/// Windowed draws append whole windows, so the result may overshoot `length`
/// by up to `2 * half_width - 1` changes.
pub fn resample<R: Rng + ?Sized>(
    changes: &[f64],
    scheme: ResampleScheme,
    length: usize,
    rng: &mut R,
) -> Result<Vec<f64>, EngineError> {
    if changes.is_empty() {
        return Err(EngineError::EmptyData {
            what: "resample".into(),
        });
    }
    ensure_window_fits(changes, scheme)?;

    let mut seq = Vec::with_capacity(length);
    match scheme {
        ResampleScheme::Iid => {
            while seq.len() < length {
                seq.push(changes[rng.gen_range(0..changes.len())]);
            }
        }
        ResampleScheme::Windowed { half_width } => {
            let width = 2 * half_width;
            let starts = changes.len() - width + 1;
            while seq.len() < length {
                let start = rng.gen_range(0..starts);
                seq.extend_from_slice(&changes[start..start + width]);
            }
        }
    }
    Ok(seq)
}

fn ensure_window_fits(changes: &[f64], scheme: ResampleScheme) -> Result<(), EngineError> {
    if let ResampleScheme::Windowed { half_width } = scheme {
        let need = half_width.saturating_mul(2);
        if need > changes.len() {
            return Err(EngineError::InsufficientData {
                what: "serial-dependence window".into(),
                have: changes.len(),
                need,
            });
        }
    }
    Ok(())
}

/// Quantile of ascending `sorted` data using plotting positions
/// `(k - alphap) / (n + 1 - alphap - betap)`.
pub fn mquantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        1 => sorted[0],
        _ => {
            let m = ALPHAP + p * (1.0 - ALPHAP - BETAP);
            let aleph = n as f64 * p + m;
            let k = aleph.clamp(1.0, (n - 1) as f64).floor();
            let gamma = (aleph - k).clamp(0.0, 1.0);
            let k = k as usize;
            (1.0 - gamma) * sorted[k - 1] + gamma * sorted[k]
        }
    }
}

fn mean_and_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
