//! Weighted-evidence confidence scoring

/// One boolean signal with its weight, evaluated fresh for every detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceIndicator {
    pub weight: u32,
    pub satisfied: bool,
}

impl ConfidenceIndicator {
    pub fn new(weight: u32, satisfied: bool) -> Self {
        Self { weight, satisfied }
    }
}

/// Sum of satisfied weights over total weight, `0.0` when there is no weight at all
pub fn score(indicators: &[ConfidenceIndicator]) -> f64 {
    let total: u64 = indicators.iter().map(|i| u64::from(i.weight)).sum();
    if total == 0 {
        return 0.0;
    }

    let satisfied: u64 = indicators
        .iter()
        .filter(|i| i.satisfied)
        .map(|i| u64::from(i.weight))
        .sum();

    satisfied as f64 / total as f64
}
