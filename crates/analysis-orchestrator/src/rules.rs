//! Rule tables applied to the latest indicator snapshot.

use analysis_core::{RiskLevel, TechnicalSummary};

pub const OVERSOLD_RSI: f64 = 30.0;
pub const OVERBOUGHT_RSI: f64 = 70.0;

pub const OVERSOLD_HINT: &str = "Consider buying - RSI indicates oversold conditions";
pub const OVERBOUGHT_HINT: &str = "Consider selling - RSI indicates overbought conditions";
pub const BULLISH_CROSS_HINT: &str = "Bullish signal - 20-day SMA above 50-day SMA";

/// Placeholder confidence reported with every analysis.
pub const CONFIDENCE_SCORE: f64 = 85.0;

pub fn derive_recommendations(summary: &TechnicalSummary) -> Vec<String> {
    let mut recommendations = Vec::new();

    match summary.rsi {
        Some(rsi) if rsi < OVERSOLD_RSI => recommendations.push(OVERSOLD_HINT.to_string()),
        Some(rsi) if rsi > OVERBOUGHT_RSI => recommendations.push(OVERBOUGHT_HINT.to_string()),
        _ => {}
    }

    if let (Some(short), Some(long)) = (summary.sma_20, summary.sma_50) {
        if short > long {
            recommendations.push(BULLISH_CROSS_HINT.to_string());
        }
    }

    recommendations
}

pub fn derive_risk_level(rsi: Option<f64>) -> RiskLevel {
    match rsi {
        Some(rsi) if rsi > 80.0 || rsi < 20.0 => RiskLevel::High,
        Some(rsi) if (40.0..=60.0).contains(&rsi) => RiskLevel::Low,
        _ => RiskLevel::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(rsi: Option<f64>, sma_20: Option<f64>, sma_50: Option<f64>) -> TechnicalSummary {
        TechnicalSummary {
            current_price: 100.0,
            sma_20,
            sma_50,
            rsi,
            macd: None,
            volume: 0,
            price_change_pct: 0.0,
        }
    }

    #[test]
    fn test_risk_level_table() {
        assert_eq!(derive_risk_level(Some(85.0)), RiskLevel::High);
        assert_eq!(derive_risk_level(Some(10.0)), RiskLevel::High);
        assert_eq!(derive_risk_level(Some(50.0)), RiskLevel::Low);
        assert_eq!(derive_risk_level(Some(40.0)), RiskLevel::Low);
        assert_eq!(derive_risk_level(Some(60.0)), RiskLevel::Low);
        assert_eq!(derive_risk_level(Some(65.0)), RiskLevel::Medium);
        assert_eq!(derive_risk_level(Some(80.0)), RiskLevel::Medium);
        assert_eq!(derive_risk_level(None), RiskLevel::Medium);
    }

    #[test]
    fn test_oversold_only() {
        let recs = derive_recommendations(&summary(Some(25.0), Some(95.0), Some(100.0)));
        assert_eq!(recs, vec![OVERSOLD_HINT.to_string()]);
    }

    #[test]
    fn test_overbought_without_bullish_cross() {
        let recs = derive_recommendations(&summary(Some(75.0), Some(95.0), Some(100.0)));
        assert!(recs.contains(&OVERBOUGHT_HINT.to_string()));
        assert!(!recs.contains(&BULLISH_CROSS_HINT.to_string()));
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_hints_co_occur() {
        let recs = derive_recommendations(&summary(Some(75.0), Some(105.0), Some(100.0)));
        assert_eq!(
            recs,
            vec![OVERBOUGHT_HINT.to_string(), BULLISH_CROSS_HINT.to_string()]
        );
    }

    #[test]
    fn test_no_rule_fires() {
        assert!(derive_recommendations(&summary(Some(50.0), None, Some(100.0))).is_empty());
        assert!(derive_recommendations(&summary(None, None, None)).is_empty());
    }
}
