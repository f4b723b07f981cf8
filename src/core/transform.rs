use crate::domain::model::{DailyBar, Period, PricePoint, PriceSeries};
use crate::utils::error::{EtlError, Result};

pub const CSV_HEADER: [&str; 2] = ["Date", "Close"];

/// Keeps only the close of each bar inside `period`.
///
/// Returns the series and the number of rows dropped (missing close or out of range).
/// Provider order is kept; a series whose dates are not strictly increasing is rejected.
pub fn reduce_to_close(
    bars: Vec<DailyBar>,
    period: &Period,
    auto_adjust: bool,
) -> Result<(PriceSeries, usize)> {
    let total = bars.len();
    let mut points: Vec<PricePoint> = Vec::with_capacity(total);

    for bar in bars {
        let close = if auto_adjust {
            bar.adj_close.or(bar.close)
        } else {
            bar.close
        };

        let Some(close) = close.filter(|c| c.is_finite()) else {
            tracing::debug!("Dropping {} without a usable close", bar.date);
            continue;
        };
        if !period.contains(bar.date) {
            tracing::debug!("Dropping {} outside {}..{}", bar.date, period.start, period.end);
            continue;
        }

        if let Some(prev) = points.last() {
            if bar.date <= prev.date {
                return Err(EtlError::processing(format!(
                    "dates not strictly increasing: {} follows {}",
                    bar.date, prev.date
                )));
            }
        }

        points.push(PricePoint {
            date: bar.date,
            close,
        });
    }

    let dropped = total - points.len();
    Ok((PriceSeries { points }, dropped))
}

/// `Date,Close` CSV with `YYYY-MM-DD` dates and plain decimal prices (`218.0`, `218.36`).
pub fn render_csv(series: &PriceSeries) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for point in &series.points {
        writer.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            format_price(point.close),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EtlError::processing(format!("flushing CSV buffer failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| EtlError::processing(e.to_string()))
}

/// Shortest round-trip decimal, always with a fractional part.
fn format_price(price: f64) -> String {
    let text = price.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}
