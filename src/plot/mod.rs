//! Terminal charts.

pub mod ascii;

pub use ascii::{ChartSeries, SeriesStyle, render_dashboard_chart, render_time_chart};
