use analysis_core::{Bar, EnrichedBar, IndicatorSnapshot};

use crate::indicators::{bollinger_bands, macd, rsi, sma};

pub const SMA_SHORT_PERIOD: usize = 20;
pub const SMA_LONG_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_K: f64 = 2.0;

/// Attach the standard indicator set to every bar of an ascending series.
pub fn enrich(bars: Vec<Bar>) -> Vec<EnrichedBar> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let sma_20 = sma(&closes, SMA_SHORT_PERIOD);
    let sma_50 = sma(&closes, SMA_LONG_PERIOD);
    let rsi_14 = rsi(&closes, RSI_PERIOD);
    let macd = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let bands = bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_K);

    bars.into_iter()
        .enumerate()
        .map(|(i, bar)| EnrichedBar {
            bar,
            indicators: IndicatorSnapshot {
                sma_20: sma_20[i],
                sma_50: sma_50[i],
                rsi_14: rsi_14[i],
                macd: macd.macd_line.get(i).copied(),
                macd_signal: macd.signal_line.get(i).copied(),
                bollinger_upper: bands.upper[i],
                bollinger_lower: bands.lower[i],
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn linear_bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Bar {
                    timestamp: start + Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_enrich_preserves_bars_and_order() {
        let bars = linear_bars(60);
        let enriched = enrich(bars.clone());
        assert_eq!(enriched.len(), 60);
        for (e, b) in enriched.iter().zip(&bars) {
            assert_eq!(&e.bar, b);
        }
    }

    #[test]
    fn test_enrich_warm_up_windows() {
        let enriched = enrich(linear_bars(60));

        assert!(enriched[18].indicators.sma_20.is_none());
        assert!(enriched[19].indicators.sma_20.is_some());
        assert!(enriched[48].indicators.sma_50.is_none());
        assert!(enriched[49].indicators.sma_50.is_some());
        assert!(enriched[19].indicators.bollinger_upper.is_some());
        // MACD is seeded by the first close, so it exists from bar zero
        assert!(enriched[0].indicators.macd.is_some());
        assert!(enriched[0].indicators.macd_signal.is_some());
    }

    #[test]
    fn test_enrich_short_series_has_no_long_indicators() {
        let enriched = enrich(linear_bars(30));
        assert!(enriched.iter().all(|e| e.indicators.sma_50.is_none()));
        assert!(enriched.iter().any(|e| e.indicators.sma_20.is_some()));
    }

    #[test]
    fn test_enrich_series_shorter_than_every_window() {
        // alternating closes so RSI would be defined given enough bars
        let mut bars = linear_bars(RSI_PERIOD);
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.close = if i % 2 == 0 { 100.0 } else { 101.0 };
        }
        let enriched = enrich(bars);

        assert_eq!(enriched.len(), RSI_PERIOD);
        for e in &enriched {
            assert!(e.indicators.sma_20.is_none());
            assert!(e.indicators.sma_50.is_none());
            assert!(e.indicators.rsi_14.is_none());
            assert!(e.indicators.bollinger_upper.is_none());
            assert!(e.indicators.bollinger_lower.is_none());
        }
    }

    #[test]
    fn test_enrich_rsi_undefined_without_losses() {
        // strictly rising closes: average loss is zero everywhere
        let enriched = enrich(linear_bars(40));
        assert!(enriched.iter().all(|e| e.indicators.rsi_14.is_none()));
    }

    #[test]
    fn test_enrich_empty() {
        assert!(enrich(Vec::new()).is_empty());
    }
}
