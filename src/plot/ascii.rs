//! ASCII price-over-time chart for terminal output and the markdown report.
//!
//! Fixed-size grid, deterministic output. Plot elements:
//! - actual prices: `o`
//! - predicted prices: `-` line
//! - smoothed actual prices: `*` line
//!
//! Lines are drawn first so points overlay them.

use chrono::NaiveDate;

use crate::app::pipeline::DashboardRun;
use crate::domain::CanonicalField;
use crate::metrics::dated_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Points,
    Line,
}

/// One date-ordered series to draw.
#[derive(Debug, Clone, Copy)]
pub struct ChartSeries<'a> {
    pub glyph: char,
    pub style: SeriesStyle,
    pub points: &'a [(NaiveDate, f64)],
}

/// Chart the dashboard's in-scope actual, predicted and smoothed series.
pub fn render_dashboard_chart(run: &DashboardRun, width: usize, height: usize) -> String {
    let actual = dated_values(&run.filtered, CanonicalField::ActualPrice);
    let predicted = dated_values(&run.filtered, CanonicalField::PredictedPrice);
    let smoothed = run.smoothed.as_deref().unwrap_or(&[]);

    let mut legend = Vec::new();
    if !actual.is_empty() {
        legend.push("o actual".to_string());
    }
    if !predicted.is_empty() {
        legend.push("- predicted".to_string());
    }
    if !smoothed.is_empty() && run.smooth_window.get() > 1 {
        legend.push(format!("* smoothed (w={})", run.smooth_window));
    }

    // Window 1 would just retrace the actual points.
    let smoothed: &[(NaiveDate, f64)] = if run.smooth_window.get() > 1 { smoothed } else { &[] };

    let mut out = render_time_chart(
        &[
            ChartSeries {
                glyph: '*',
                style: SeriesStyle::Line,
                points: smoothed,
            },
            ChartSeries {
                glyph: '-',
                style: SeriesStyle::Line,
                points: &predicted,
            },
            ChartSeries {
                glyph: 'o',
                style: SeriesStyle::Points,
                points: &actual,
            },
        ],
        width,
        height,
    );
    if !legend.is_empty() {
        out.push_str(&legend.join("  "));
        out.push('\n');
    }
    out
}

/// Render series over a shared date axis.
pub fn render_time_chart(series: &[ChartSeries<'_>], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((d_min, d_max)) = date_range(series) else {
        return "Plot: no dated values to chart\n".to_string();
    };
    let t_max = ((d_max - d_min).num_days() as f64).max(1.0);
    let x_of = |d: NaiveDate| map_x((d - d_min).num_days() as f64, 0.0, t_max, width);

    let (y_min, y_max) = y_range(series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for s in series.iter().filter(|s| s.style == SeriesStyle::Line) {
        let mut prev = None;
        for &(d, y) in s.points {
            let x = x_of(d);
            let yy = map_y(y, y_min, y_max, height);
            match prev {
                Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, yy, s.glyph),
                None => draw_line(&mut grid, x, yy, x, yy, s.glyph),
            }
            prev = Some((x, yy));
        }
    }
    for s in series.iter().filter(|s| s.style == SeriesStyle::Points) {
        for &(d, y) in s.points {
            grid[map_y(y, y_min, y_max, height)][x_of(d)] = s.glyph;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: date=[{d_min}, {d_max}] | price=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn date_range(series: &[ChartSeries<'_>]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d));
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

fn y_range(series: &[ChartSeries<'_>]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in series.iter().flat_map(|s| s.points.iter()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y > min_y {
        Some((min_y, max_y))
    } else {
        // Flat series: centre it.
        Some((min_y - 1.0, max_y + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham); only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let actual = [(jan(1), 100.0), (jan(10), 110.0)];
        let predicted = [(jan(1), 100.0), (jan(10), 100.0)];
        let txt = render_time_chart(
            &[
                ChartSeries {
                    glyph: '-',
                    style: SeriesStyle::Line,
                    points: &predicted,
                },
                ChartSeries {
                    glyph: 'o',
                    style: SeriesStyle::Points,
                    points: &actual,
                },
            ],
            10,
            5,
        );
        let expected = concat!(
            "Plot: date=[2024-01-01, 2024-01-10] | price=[99.50, 110.50]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn single_point_is_still_drawn() {
        let actual = [(jan(5), 3.0)];
        let txt = render_time_chart(
            &[ChartSeries {
                glyph: 'o',
                style: SeriesStyle::Points,
                points: &actual,
            }],
            10,
            5,
        );
        let marks: usize = txt.lines().skip(1).map(|l| l.matches('o').count()).sum();
        assert_eq!(marks, 1);
        assert!(txt.starts_with("Plot: date=[2024-01-05, 2024-01-05]"));
    }

    #[test]
    fn empty_input_says_so() {
        let txt = render_time_chart(&[], 40, 10);
        assert_eq!(txt, "Plot: no dated values to chart\n");
    }
}
