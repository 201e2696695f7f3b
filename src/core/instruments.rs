//! Static instrument reference table.
//!
//! Compiled-in historical statistics standing in for a live market-data feed.
//! Return sequences are annual decimal fractions; `crisis_shock` is the
//! instrument's return over the reference crisis window, `None` where the
//! instrument has no history for that window.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instrument {
    pub symbol: &'static str,
    pub display_name: &'static str,
    pub historical_returns: &'static [f64],
    pub volatility: f64,
    pub max_drawdown: f64,
    pub crisis_shock: Option<f64>,
}

impl Instrument {
    /// Arithmetic mean of the fixed historical-return sequence.
    pub fn mean_return(&self) -> f64 {
        let sum: f64 = self.historical_returns.iter().sum();
        sum / self.historical_returns.len() as f64
    }
}

pub const INSTRUMENTS: [Instrument; 6] = [
    Instrument {
        symbol: "SWDA",
        display_name: "World equity index fund",
        historical_returns: &[0.05, 0.19, -0.08, 0.26, 0.14, 0.20, -0.18, 0.10],
        volatility: 0.15,
        max_drawdown: 0.34,
        crisis_shock: Some(-0.42),
    },
    Instrument {
        symbol: "SPY",
        display_name: "US equity index fund",
        historical_returns: &[0.10, 0.21, -0.04, 0.31, 0.18, 0.28, -0.18, -0.02],
        volatility: 0.18,
        max_drawdown: 0.37,
        crisis_shock: Some(-0.38),
    },
    Instrument {
        symbol: "SHY",
        display_name: "Short-term government bonds",
        historical_returns: &[0.012, 0.008, 0.015, 0.035, 0.030, -0.005, 0.010, 0.035],
        volatility: 0.03,
        max_drawdown: 0.06,
        crisis_shock: Some(0.05),
    },
    Instrument {
        symbol: "TLT",
        display_name: "Long-term government bonds",
        historical_returns: &[0.012, 0.090, -0.016, 0.146, 0.180, -0.046, -0.180, 0.054],
        volatility: 0.13,
        max_drawdown: 0.45,
        crisis_shock: Some(0.26),
    },
    Instrument {
        symbol: "CASH",
        display_name: "Cash deposits",
        historical_returns: &[0.012, 0.015, 0.020, 0.023, 0.008, 0.003, 0.052, 0.067],
        volatility: 0.005,
        max_drawdown: 0.0,
        crisis_shock: Some(0.02),
    },
    Instrument {
        symbol: "CRYPTO",
        display_name: "Crypto basket",
        historical_returns: &[0.90, 1.30, -0.73, 0.95, 3.05, 0.60, -0.64, 0.37],
        volatility: 0.80,
        max_drawdown: 0.83,
        // No data for the reference crisis window; the asset did not exist.
        crisis_shock: None,
    },
];

/// Read-only lookup by symbol. Returns `None` for unknown symbols.
pub fn instrument(symbol: &str) -> Option<&'static Instrument> {
    INSTRUMENTS.iter().find(|i| i.symbol == symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_all_table_symbols() {
        for entry in &INSTRUMENTS {
            let found = instrument(entry.symbol).expect("symbol must resolve");
            assert_eq!(found.symbol, entry.symbol);
        }
    }

    #[test]
    fn lookup_rejects_unknown_symbol() {
        assert!(instrument("GLD").is_none());
        assert!(instrument("").is_none());
    }

    #[test]
    fn crypto_has_no_crisis_history() {
        let crypto = instrument("CRYPTO").expect("CRYPTO is in the table");
        assert!(crypto.crisis_shock.is_none());
    }

    #[test]
    fn mean_returns_match_authored_values() {
        let expected = [
            ("SWDA", 0.085),
            ("SPY", 0.105),
            ("SHY", 0.0175),
            ("TLT", 0.03),
            ("CASH", 0.025),
            ("CRYPTO", 0.725),
        ];
        for (symbol, mean) in expected {
            let inst = instrument(symbol).expect("symbol must resolve");
            assert!(
                (inst.mean_return() - mean).abs() <= 1e-9,
                "{symbol}: expected {mean}, got {}",
                inst.mean_return()
            );
        }
    }
}
