use std::{fmt::Display, ops::Deref};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `value` in `whole`. An empty whole yields 0% instead of NaN.
pub fn seconds_percentage(value: u64, whole: u64) -> Percentage {
    if whole == 0 {
        Percentage(0.)
    } else {
        Percentage(value as f64 / whole as f64 * 100.)
    }
}
