use paper_api::{CommissionCalculator, CommissionError, Instrument};
use serde::{Deserialize, Serialize};

/// Linear fee schedule: a fixed charge per fill, a charge per unit, and a
/// rate on notional, floored at a minimum.
///
/// ```text
/// commission = max(minimum, per_fill + per_unit * quantity + rate * price * quantity * lot_size)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub per_fill: f64,
    #[serde(default)]
    pub per_unit: f64,
    /// Fraction of notional, e.g. 0.0005 for 5 bps.
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub minimum: f64,
}

impl FeeSchedule {
    /// A pure notional-rate schedule.
    pub fn rate(rate: f64) -> Self {
        Self {
            rate,
            ..Self::default()
        }
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = minimum;
        self
    }
}

impl CommissionCalculator for FeeSchedule {
    fn commission(
        &self,
        instrument: &Instrument,
        price: f64,
        quantity: f64,
    ) -> Result<f64, CommissionError> {
        let notional = price * quantity * instrument.lot_size();
        let fee = self.per_fill + self.per_unit * quantity + self.rate * notional;
        if !fee.is_finite() {
            return Err(CommissionError::NonFinite {
                symbol: instrument.symbol().clone(),
                value: fee,
            });
        }
        Ok(fee.max(self.minimum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_with_minimum() {
        let inst = Instrument::new("AAPL", "NASDAQ", "USD");
        let schedule = FeeSchedule::rate(0.001).with_minimum(1.0);

        // 10 * 5 * 0.001 = 0.05, floored to the minimum
        assert_eq!(schedule.commission(&inst, 10.0, 5.0).unwrap(), 1.0);
        // 100 * 50 * 0.001 = 5.0
        assert!((schedule.commission(&inst, 100.0, 50.0).unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_per_unit_and_lot_size() {
        let inst = Instrument::new("ES", "CME", "USD").with_lot_size(50.0);
        let schedule = FeeSchedule {
            per_fill: 1.0,
            per_unit: 0.5,
            rate: 0.0001,
            minimum: 0.0,
        };
        // 1 + 0.5 * 2 + 0.0001 * 4000 * 2 * 50 = 1 + 1 + 40
        let fee = schedule.commission(&inst, 4000.0, 2.0).unwrap();
        assert!((fee - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_fee_is_an_error() {
        let inst = Instrument::new("BAD", "X", "USD");
        let err = FeeSchedule::rate(f64::INFINITY)
            .commission(&inst, 1.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, CommissionError::NonFinite { .. }));
    }
}
