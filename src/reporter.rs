// =============================================================================
// Reporter — console output of the recommendation list
// =============================================================================

use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::types::Recommendation;

/// Render a price the way a float prints in a plain script: shortest
/// round-trip digits, integral values keep one decimal (`50000000.0`), and
/// decimal exponents below -4 or from 16 up switch to scientific form with a
/// signed two-digit exponent (`1e-05`, `1.5e+16`).
pub fn format_price(price: f64) -> String {
    if price.is_nan() {
        return "nan".to_string();
    }
    if price.is_infinite() {
        return if price > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // `{:e}` yields the shortest digits, e.g. `1.5e16` / `-1e-5`.
    let sci = format!("{price:e}");
    if let Some((mantissa, exp)) = sci.split_once('e') {
        if let Ok(exp) = exp.parse::<i32>() {
            if price != 0.0 && (exp < -4 || exp >= 16) {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{mantissa}e{sign}{:02}", exp.abs());
            }
        }
    }

    if price.fract() == 0.0 {
        format!("{price:.1}")
    } else {
        format!("{price}")
    }
}

/// `Buy <ticker> at <price>`
pub fn format_recommendation(rec: &Recommendation) -> String {
    format!("Buy {} at {}", rec.ticker, format_price(rec.current_price))
}

/// Write one line per recommendation to `out`.
pub fn write_report<W: Write>(out: &mut W, recommendations: &[Recommendation]) -> Result<()> {
    for rec in recommendations {
        writeln!(out, "{}", format_recommendation(rec)).context("failed to write report line")?;
    }
    out.flush().context("failed to flush report")?;
    Ok(())
}

/// Print the report to stdout.
pub fn print_report(recommendations: &[Recommendation]) -> Result<()> {
    if recommendations.is_empty() {
        info!("no ticker met the buy conditions");
    }
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_report(&mut lock, recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ticker: &str, price: f64) -> Recommendation {
        Recommendation {
            ticker: ticker.to_string(),
            current_price: price,
        }
    }

    #[test]
    fn integral_price_keeps_one_decimal() {
        assert_eq!(format_price(50_000_000.0), "50000000.0");
        assert_eq!(format_price(0.0), "0.0");
    }

    #[test]
    fn fractional_price_prints_shortest() {
        assert_eq!(format_price(1234.5), "1234.5");
        assert_eq!(format_price(0.000123), "0.000123");
    }

    #[test]
    fn small_prices_switch_to_exponent_below_1e_minus_4() {
        assert_eq!(format_price(0.0001), "0.0001");
        assert_eq!(format_price(0.00001), "1e-05");
        assert_eq!(format_price(0.000012345), "1.2345e-05");
        assert_eq!(format_price(-0.00001), "-1e-05");
        assert_eq!(format_price(1.5e-300), "1.5e-300");
    }

    #[test]
    fn large_prices_switch_to_exponent_from_1e16() {
        assert_eq!(format_price(9_999_999_999_999_998.0), "9999999999999998.0");
        assert_eq!(format_price(1e16), "1e+16");
        assert_eq!(format_price(1.5e16), "1.5e+16");
        assert_eq!(format_price(1.2e123), "1.2e+123");
    }

    #[test]
    fn non_finite_prices() {
        assert_eq!(format_price(f64::NAN), "nan");
        assert_eq!(format_price(f64::INFINITY), "inf");
        assert_eq!(format_price(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn line_format() {
        assert_eq!(
            format_recommendation(&rec("KRW-BTC", 50_000_000.0)),
            "Buy KRW-BTC at 50000000.0"
        );
    }

    #[test]
    fn report_one_line_per_recommendation_in_order() {
        let mut buf = Vec::new();
        write_report(&mut buf, &[rec("KRW-XRP", 812.5), rec("KRW-ADA", 640.0)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Buy KRW-XRP at 812.5\nBuy KRW-ADA at 640.0\n");
    }

    #[test]
    fn empty_report_writes_nothing() {
        let mut buf = Vec::new();
        write_report(&mut buf, &[]).unwrap();
        assert!(buf.is_empty());
    }
}
