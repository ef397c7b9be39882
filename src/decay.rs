use crate::{Error, Result};

/// An episode-indexed schedule for the exploration rate
pub trait Decay {
    /// Calculate epsilon at episode `t`
    fn evaluate(&self, t: u32) -> f64;
}

/// Both ends must be probabilities and the rate must move from `vi` towards `vf`
fn validate(rate: f64, vi: f64, vf: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&vi) || !(0.0..=1.0).contains(&vf) {
        return Err(Error::config(format!(
            "epsilon schedule must stay in [0, 1], got {vi} -> {vf}"
        )));
    }
    ((rate >= 0.0 && vi >= vf) || (rate < 0.0 && vi <= vf))
        .then_some(())
        .ok_or_else(|| Error::config("`vi - vf` must have same sign as `rate`"))
}

/// A constant epsilon
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: u32) -> f64 {
        self.value
    }
}

/// Epsilon moving by `rate` per episode from `vi`, clamped at `vf`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Linear {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl Linear {
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Linear {
    fn evaluate(&self, t: u32) -> f64 {
        let &Self { rate, vi, vf } = self;
        let v = vi - rate * t as f64;
        if rate >= 0.0 {
            v.max(vf)
        } else {
            v.min(vf)
        }
    }
}
