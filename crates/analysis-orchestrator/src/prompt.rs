//! Prompt assembly for the analysis completion.

use analysis_core::{stats, AnalysisError, EnrichedBar, NewsItem, TechnicalSummary};

/// Trailing window the "recent" price change is measured over.
pub const RECENT_WINDOW: usize = 20;
/// Headlines quoted in the prompt.
pub const PROMPT_NEWS_ITEMS: usize = 3;
/// Characters of each news summary quoted in the prompt.
pub const NEWS_SUMMARY_CHARS: usize = 100;

pub const SYSTEM_ROLE: &str = "You are a world-class financial analyst with 20+ years of experience. \
Provide detailed, actionable investment advice based on technical and fundamental analysis.";
pub const TEMPERATURE: f32 = 0.3;
pub const MAX_TOKENS: u32 = 2000;

/// Latest-bar indicator view of an enriched history.
pub fn summarize(history: &[EnrichedBar]) -> Result<TechnicalSummary, AnalysisError> {
    let latest = history
        .last()
        .ok_or_else(|| AnalysisError::NotFound("No price history to summarize".to_string()))?;
    let window_start = &history[history.len().saturating_sub(RECENT_WINDOW)];

    Ok(TechnicalSummary {
        current_price: latest.bar.close,
        sma_20: latest.indicators.sma_20,
        sma_50: latest.indicators.sma_50,
        rsi: latest.indicators.rsi_14,
        macd: latest.indicators.macd,
        volume: latest.bar.volume.max(0.0).round() as u64,
        price_change_pct: stats::percent_change(window_start.bar.close, latest.bar.close),
    })
}

/// Render the user prompt sent alongside [`SYSTEM_ROLE`].
pub fn build_prompt(
    symbol: &str,
    summary: &TechnicalSummary,
    news: &[NewsItem],
    query: &str,
) -> String {
    let news_lines: Vec<String> = news
        .iter()
        .take(PROMPT_NEWS_ITEMS)
        .map(|item| format!("- {}: {}...", item.title, truncate_chars(&item.summary, NEWS_SUMMARY_CHARS)))
        .collect();
    let news_section = if news_lines.is_empty() {
        "No recent news available.".to_string()
    } else {
        news_lines.join("\n")
    };

    format!(
        "You are an expert financial analyst and portfolio manager. Analyze the following stock data for {symbol} and provide comprehensive insights.

CURRENT MARKET DATA:
- Current Price: ${price:.2}
- 20-day SMA: {sma_20}
- 50-day SMA: {sma_50}
- RSI: {rsi}
- MACD: {macd}
- Volume: {volume}
- Price Change ({window} days): {change:.2}%

RECENT NEWS:
{news_section}

USER QUERY: {query}

Please provide:
1. Comprehensive technical analysis
2. Fundamental outlook based on news
3. Risk assessment (Low/Medium/High)
4. Specific actionable recommendations
5. Confidence score (0-100)
6. Market timing considerations

Format your response as a detailed analysis followed by clear recommendations.",
        symbol = symbol,
        price = summary.current_price,
        sma_20 = fmt_or_na(summary.sma_20, |v| format!("${:.2}", v)),
        sma_50 = fmt_or_na(summary.sma_50, |v| format!("${:.2}", v)),
        rsi = fmt_or_na(summary.rsi, |v| format!("{:.2}", v)),
        macd = fmt_or_na(summary.macd, |v| format!("{:.4}", v)),
        volume = group_thousands(summary.volume),
        window = RECENT_WINDOW,
        change = summary.price_change_pct,
        news_section = news_section,
        query = query,
    )
}

fn fmt_or_na(value: Option<f64>, f: impl Fn(f64) -> String) -> String {
    value.map(f).unwrap_or_else(|| "N/A".to_string())
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Bar, IndicatorSnapshot};
    use chrono::{Duration, TimeZone, Utc};

    fn history(closes: &[f64]) -> Vec<EnrichedBar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| EnrichedBar {
                bar: Bar {
                    timestamp: start + Duration::days(i as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1_234_567.4,
                },
                indicators: IndicatorSnapshot::default(),
            })
            .collect()
    }

    fn summary() -> TechnicalSummary {
        TechnicalSummary {
            current_price: 189.5,
            sma_20: Some(185.123),
            sma_50: None,
            rsi: Some(55.555),
            macd: None,
            volume: 52_000_000,
            price_change_pct: 3.456,
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_summarize_uses_trailing_window() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let s = summarize(&history(&closes)).unwrap();

        assert_eq!(s.current_price, 129.0);
        assert_eq!(s.volume, 1_234_567);
        // window starts at close 110
        assert!((s.price_change_pct - (19.0 / 110.0 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_short_history_uses_first_bar() {
        let s = summarize(&history(&[50.0, 55.0])).unwrap();
        assert!((s.price_change_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty_is_not_found() {
        assert!(summarize(&[]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_prompt_embeds_indicators_and_na() {
        let prompt = build_prompt("AAPL", &summary(), &[], "Should I buy?");

        assert!(prompt.contains("stock data for AAPL"));
        assert!(prompt.contains("- Current Price: $189.50"));
        assert!(prompt.contains("- 20-day SMA: $185.12"));
        assert!(prompt.contains("- 50-day SMA: N/A"));
        assert!(prompt.contains("- RSI: 55.55") || prompt.contains("- RSI: 55.56"));
        assert!(prompt.contains("- MACD: N/A"));
        assert!(prompt.contains("- Volume: 52,000,000"));
        assert!(prompt.contains("- Price Change (20 days): 3.46%"));
        assert!(prompt.contains("No recent news available."));
        assert!(prompt.contains("USER QUERY: Should I buy?"));
    }

    #[test]
    fn test_prompt_quotes_at_most_three_truncated_headlines() {
        let news: Vec<NewsItem> = (0..5)
            .map(|i| NewsItem {
                title: format!("Headline {}", i),
                summary: "x".repeat(150),
                link: format!("https://example.com/{}", i),
            })
            .collect();
        let prompt = build_prompt("MSFT", &summary(), &news, "outlook");

        assert!(prompt.contains("Headline 2"));
        assert!(!prompt.contains("Headline 3"));
        let expected = format!("- Headline 0: {}...", "x".repeat(100));
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt("TSLA", &summary(), &[], "q");
        let b = build_prompt("TSLA", &summary(), &[], "q");
        assert_eq!(a, b);
    }
}
