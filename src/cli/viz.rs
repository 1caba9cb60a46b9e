//! Terminal visualization of simulated distributions
//!
//! Renders ASCII histograms and interval bars against a one-sided
//! specification limit using box-drawing and block characters.

use console::style;

use crate::entities::LimitType;

/// Width of the longest histogram bar
const BAR_MAX_WIDTH: usize = 50;

/// Width of the interval bar
const RANGE_BAR_WIDTH: usize = 60;

/// Render a histogram of samples, marking the bin holding the limit
///
/// Bins whose center violates the limit are drawn with `░`, the rest
/// with `█`. The view is widened so the limit is always visible.
pub fn render_histogram(samples: &[f64], bins: usize, limit: Option<(f64, LimitType)>) -> String {
    if samples.is_empty() || bins == 0 {
        return String::new();
    }

    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = spread(min, max);

    let (range_min, range_max) = match limit {
        Some((l, _)) => (min.min(l - span * 0.1), max.max(l + span * 0.1)),
        None if max > min => (min, max),
        None => (min - span / 2.0, max + span / 2.0),
    };
    let bin_width = (range_max - range_min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &sample in samples {
        let bin = ((sample - range_min) / bin_width) as usize;
        counts[bin.min(bins - 1)] += 1;
    }

    let max_count = counts.iter().copied().max().unwrap_or(1).max(1);
    let limit_bin = limit.map(|(l, _)| (((l - range_min) / bin_width) as usize).min(bins - 1));

    let mut lines = Vec::with_capacity(bins + 3);
    lines.push(format!(
        "   {} ({} samples, {} bins):",
        style("Distribution Histogram").bold(),
        samples.len(),
        bins
    ));

    for (i, &count) in counts.iter().enumerate() {
        let bar_width = (count as f64 / max_count as f64 * BAR_MAX_WIDTH as f64) as usize;
        let bin_center = range_min + (i as f64 + 0.5) * bin_width;
        let in_spec = match limit {
            Some((l, limit_type)) => !limit_type.is_violated(bin_center, l),
            None => true,
        };

        let bar = if in_spec {
            style("█".repeat(bar_width)).green()
        } else {
            style("░".repeat(bar_width)).red()
        };
        let marker = if Some(i) == limit_bin { " ◄LIMIT" } else { "" };

        lines.push(format!(
            "   {:>10.3} │{:<width$}│ {:>6}{}",
            bin_center,
            bar,
            count,
            style(marker).cyan(),
            width = BAR_MAX_WIDTH
        ));
    }

    lines.push(format!("   {:>10} └{}┘", "", "─".repeat(BAR_MAX_WIDTH)));
    match limit {
        Some((l, limit_type)) => lines.push(format!(
            "   {} {} limit={:.3}  (█ in-spec, ░ out-of-spec)",
            style("Legend:").dim(),
            limit_type,
            l
        )),
        None => lines.push(format!("   {} no specification limit", style("Legend:").dim())),
    }

    lines.join("\n")
}

/// Render a confidence interval against a one-sided limit
///
/// The interval is drawn as `[═══]`, the limit as `│` (`╋` where they overlap).
pub fn render_range_bar(low: f64, high: f64, limit: f64, limit_type: LimitType) -> String {
    let width = RANGE_BAR_WIDTH;
    let view_min = low.min(limit);
    let view_max = high.max(limit);
    let margin = spread(view_min, view_max) * 0.1;
    let view_min = view_min - margin;
    let view_range = view_max + margin - view_min;

    let pos = |v: f64| (((v - view_min) / view_range * width as f64) as usize).min(width - 1);
    let (pos_low, pos_high, pos_limit) = (pos(low), pos(high), pos(limit));

    let mut bar: Vec<char> = vec!['─'; width];
    bar[pos_limit] = '│';
    for c in bar.iter_mut().take(pos_high + 1).skip(pos_low) {
        *c = if *c == '│' { '╋' } else { '═' };
    }
    bar[pos_low] = if pos_low == pos_limit { '╟' } else { '[' };
    bar[pos_high] = if pos_high == pos_limit { '╢' } else { ']' };

    format!(
        "  {} limit={:.3}\n  {}\n  CI=[{:.3}, {:.3}]",
        limit_type,
        limit,
        bar.into_iter().collect::<String>(),
        low,
        high
    )
}

/// Width of `[min, max]`, or a tenth of the magnitude when the range is degenerate
fn spread(min: f64, max: f64) -> f64 {
    if max > min {
        max - min
    } else {
        max.abs().max(1.0) * 0.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_has_one_row_per_bin() {
        let samples: Vec<f64> = (0..1000).map(|i| i as f64 / 10.0).collect();
        let out = render_histogram(&samples, 20, Some((80.0, LimitType::Upper)));
        // header + bins + axis + legend
        assert_eq!(out.lines().count(), 23);
        assert!(out.contains("◄LIMIT"));
        assert!(out.contains("1000 samples"));
    }

    #[test]
    fn test_histogram_without_limit() {
        let out = render_histogram(&[1.0, 2.0, 3.0], 5, None);
        assert!(!out.contains("◄LIMIT"));
        assert!(out.contains("no specification limit"));
    }

    #[test]
    fn test_histogram_constant_sample() {
        let out = render_histogram(&[5.0; 100], 10, Some((5.0, LimitType::Lower)));
        assert_eq!(out.lines().count(), 13);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(render_histogram(&[], 10, None).is_empty());
    }

    #[test]
    fn test_range_bar_marks_interval() {
        let out = render_range_bar(20.0, 28.0, 30.0, LimitType::Upper);
        let bar = out.lines().nth(1).unwrap();
        assert!(bar.contains('['));
        assert!(bar.contains(']'));
        assert!(bar.contains('│'));
        assert!(out.contains("CI=[20.000, 28.000]"));
    }
}
