//! Gamma-distributed arrival delays.
//!
//! Each delay cluster has a fitted three-parameter gamma distribution
//! (shape, location, scale) over arrival delay in seconds. The probability
//! of making a connection with a given slack is the distribution's CDF at
//! that slack. Clusters without enough history fall back to a distribution
//! fitted per transport category, then to a global fallback if one is set.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{Connection, ConnectionKind, DelayKey, TransportCategory, Trip};

use super::{DelayOracle, OracleError};

/// Parameters of a shifted gamma distribution, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaParams {
    pub shape: f64,
    #[serde(default)]
    pub loc: f64,
    pub scale: f64,
}

impl GammaParams {
    /// Create validated parameters.
    pub fn new(shape: f64, loc: f64, scale: f64) -> Result<Self, OracleError> {
        let params = Self { shape, loc, scale };
        params.validate("params")?;
        Ok(params)
    }

    fn validate(&self, key: &str) -> Result<(), OracleError> {
        let reason = if !(self.shape.is_finite() && self.shape > 0.0) {
            "shape must be positive"
        } else if !(self.scale.is_finite() && self.scale > 0.0) {
            "scale must be positive"
        } else if !self.loc.is_finite() {
            "loc must be finite"
        } else {
            return Ok(());
        };
        Err(OracleError::InvalidParams {
            key: key.to_string(),
            reason,
        })
    }

    /// Probability that the delay is at most `delay_secs`.
    pub fn cdf(&self, delay_secs: f64) -> f64 {
        let x = (delay_secs - self.loc) / self.scale;
        if x <= 0.0 {
            return 0.0;
        }
        regularized_lower_gamma(self.shape, x)
    }
}

/// Delay oracle backed by fitted gamma distributions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GammaDelayModel {
    /// Parameters per delay cluster.
    #[serde(default)]
    by_key: HashMap<DelayKey, GammaParams>,

    /// Coarse parameters per transport category.
    #[serde(default)]
    by_category: HashMap<TransportCategory, GammaParams>,

    /// Used when neither the cluster nor the category is known.
    #[serde(default)]
    fallback: Option<GammaParams>,
}

impl GammaDelayModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parameters for one delay cluster.
    pub fn with_key(mut self, key: DelayKey, params: GammaParams) -> Self {
        self.by_key.insert(key, params);
        self
    }

    /// Set the parameters for a transport category.
    pub fn with_category(mut self, category: TransportCategory, params: GammaParams) -> Self {
        self.by_category.insert(category, params);
        self
    }

    /// Set the parameters used when nothing more specific is known.
    pub fn with_fallback(mut self, params: GammaParams) -> Self {
        self.fallback = Some(params);
        self
    }

    /// Parse and validate a model from JSON.
    pub fn from_json(json: &str) -> Result<Self, OracleError> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load a model from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, OracleError> {
        let contents = std::fs::read_to_string(path).map_err(|source| OracleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Number of delay clusters with their own parameters.
    pub fn cluster_count(&self) -> usize {
        self.by_key.len()
    }

    /// The most specific parameters available for a trip.
    pub fn params_for(&self, trip: &Trip) -> Option<&GammaParams> {
        self.by_key
            .get(&trip.delay_key)
            .or_else(|| self.by_category.get(&trip.category))
            .or(self.fallback.as_ref())
    }

    fn validate(&self) -> Result<(), OracleError> {
        for (key, params) in &self.by_key {
            params.validate(key.as_str())?;
        }
        for (category, params) in &self.by_category {
            params.validate(category.as_str())?;
        }
        if let Some(params) = &self.fallback {
            params.validate("fallback")?;
        }
        Ok(())
    }
}

impl DelayOracle for GammaDelayModel {
    fn success_probability(&self, connection: &Connection, slack: Duration) -> Option<f64> {
        match &connection.kind {
            ConnectionKind::Walk(_) => Some(1.0),
            ConnectionKind::Scheduled(trip) => {
                let Some(params) = self.params_for(trip) else {
                    trace!(key = trip.delay_key.as_str(), "no delay data");
                    return None;
                };
                Some(params.cdf(slack.num_seconds() as f64))
            }
        }
    }
}

const MAX_ITERATIONS: usize = 500;
const EPSILON: f64 = 1e-14;
const TINY: f64 = 1e-300;

/// Natural log of the gamma function (Lanczos approximation, g = 7).
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + G + 0.5;
    let series = COEFFS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFS[0], |acc, (i, c)| acc + c / (x + i as f64));

    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Regularized lower incomplete gamma function P(a, x).
fn regularized_lower_gamma(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let prefactor = (-x + a * x.ln() - ln_gamma(a)).exp();

    if x < a + 1.0 {
        // Series expansion
        let mut ap = a;
        let mut term = 1.0 / a;
        let mut sum = term;
        for _ in 0..MAX_ITERATIONS {
            ap += 1.0;
            term *= x / ap;
            sum += term;
            if term.abs() < sum.abs() * EPSILON {
                break;
            }
        }
        (sum * prefactor).clamp(0.0, 1.0)
    } else {
        // Continued fraction for Q(a, x), modified Lentz
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / TINY;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..MAX_ITERATIONS {
            let i = i as f64;
            let an = -i * (i - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < TINY {
                d = TINY;
            }
            c = b + an / c;
            if c.abs() < TINY {
                c = TINY;
            }
            d = 1.0 / d;
            let delta = d * c;
            h *= delta;
            if (delta - 1.0).abs() < EPSILON {
                break;
            }
        }
        (1.0 - prefactor * h).clamp(0.0, 1.0)
    }
}
