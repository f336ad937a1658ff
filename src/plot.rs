//! 学習の損失履歴と、厳密解・予測・誤差の比較をPNGに描画します。

use crate::error::{PinnError, Result};
use crate::inference::{Comparison, EvaluationGrid, VariableComparison};
use crate::training::LossRecord;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};

type DrawResult<T> = std::result::Result<T, Box<dyn Error>>;

fn plot_error(e: Box<dyn Error>) -> PinnError {
    PinnError::Plot(e.to_string())
}

/// 学習過程の損失をグラフとしてPNGファイルに出力します。
pub fn plot_loss_history(path: &Path, history: &[LossRecord]) -> Result<()> {
    draw_loss_history(path, history).map_err(plot_error)
}

fn draw_loss_history(path: &Path, history: &[LossRecord]) -> DrawResult<()> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let logs = history
        .iter()
        .flat_map(|r| [r.total, r.pde, r.bc])
        .filter(|v| *v > 0.0)
        .map(|v| (v as f64).log10());
    let (min_log, max_log) = logs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (min_log, max_log) = if min_log.is_finite() {
        (min_log - 0.5, max_log + 0.5)
    } else {
        (-6.0, 0.0)
    };
    let last_iter = history.last().map_or(1, |r| r.iteration.max(1));

    let mut chart = ChartBuilder::on(&root)
        .caption("Loss History", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..last_iter, min_log..max_log)?;
    chart
        .configure_mesh()
        .y_desc("Loss (log10 scale)")
        .x_desc("Iterations")
        .draw()?;

    let series: [(&str, fn(&LossRecord) -> f32, RGBColor); 3] = [
        ("Total Loss", |r| r.total, RED),
        ("PDE Loss", |r| r.pde, BLUE),
        ("Condition Loss", |r| r.bc, GREEN),
    ];
    for (label, value, color) in series {
        chart
            .draw_series(LineSeries::new(
                history
                    .iter()
                    .filter(|r| value(r) > 0.0)
                    .map(|r| (r.iteration, (value(r) as f64).log10())),
                &color,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// 厳密解・予測・絶対誤差の比較図を従属変数ごとに保存し、書き出したパスを返します。
///
/// 2次元の定義域ではヒートマップ、1次元の定義域では折れ線グラフを描きます。
pub fn plot_comparison(dir: &Path, problem: &str, comparison: &Comparison) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(comparison.vars.len());
    for var in &comparison.vars {
        let path = dir.join(format!("{}_sol_{}.png", problem, var.name));
        let drawn = match comparison.grid.dim() {
            1 => draw_lines(&path, &comparison.grid, var),
            2 => draw_heatmaps(&path, &comparison.grid, var),
            d => {
                tracing::warn!("{}次元の定義域は描画に対応していません。", d);
                return Ok(written);
            }
        };
        drawn.map_err(plot_error)?;
        written.push(path);
    }
    Ok(written)
}

fn value_range(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        (0.0, 1.0)
    } else if hi - lo < 1e-12 {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// 値を青（最小）から赤（最大）への色に対応づけます。
fn heat_color(v: f64, lo: f64, hi: f64) -> HSLColor {
    let t = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    HSLColor(0.66 * (1.0 - t), 0.8, 0.5)
}

fn draw_heatmaps(path: &Path, grid: &EvaluationGrid, var: &VariableComparison) -> DrawResult<()> {
    let root = BitMapBackend::new(path, (1500, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 3));
    let titles = [
        format!("analytic {}", var.name),
        format!("predict {}", var.name),
        format!("|error| {}", var.name),
    ];
    let data = [&var.analytic, &var.predicted, &var.abs_error];
    for ((panel, title), values) in panels.iter().zip(&titles).zip(data) {
        draw_heatmap(panel, title, grid, values)?;
    }
    root.present()?;
    Ok(())
}

fn draw_heatmap(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    title: &str,
    grid: &EvaluationGrid,
    values: &[f64],
) -> DrawResult<()> {
    let (xs, ys) = (&grid.axes[0], &grid.axes[1]);
    let (x_lo, x_hi) = value_range(xs);
    let (y_lo, y_hi) = value_range(ys);
    let dx = (x_hi - x_lo) / (xs.len().max(2) - 1) as f64;
    let dy = (y_hi - y_lo) / (ys.len().max(2) - 1) as f64;
    let (lo, hi) = value_range(values);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(x_lo - dx / 2.0..x_hi + dx / 2.0, y_lo - dy / 2.0..y_hi + dy / 2.0)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(grid.names[0].as_str())
        .y_desc(grid.names[1].as_str())
        .draw()?;

    let ny = ys.len();
    chart.draw_series(xs.iter().enumerate().flat_map(|(i, &x)| {
        ys.iter().enumerate().map(move |(j, &y)| {
            Rectangle::new(
                [(x - dx / 2.0, y - dy / 2.0), (x + dx / 2.0, y + dy / 2.0)],
                heat_color(values[i * ny + j], lo, hi).filled(),
            )
        })
    }))?;
    Ok(())
}

fn draw_lines(path: &Path, grid: &EvaluationGrid, var: &VariableComparison) -> DrawResult<()> {
    let root = BitMapBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally(600);
    let xs = &grid.axes[0];
    let (x_lo, x_hi) = value_range(xs);

    let both: Vec<f64> = var.analytic.iter().chain(&var.predicted).cloned().collect();
    let (lo, hi) = value_range(&both);
    let pad = 0.05 * (hi - lo);
    let mut chart = ChartBuilder::on(&left)
        .caption(format!("{}: analytic vs predict", var.name), ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, lo - pad..hi + pad)?;
    chart.configure_mesh().x_desc(grid.names[0].as_str()).draw()?;
    chart
        .draw_series(LineSeries::new(
            xs.iter().cloned().zip(var.analytic.iter().cloned()),
            &BLUE,
        ))?
        .label("analytic")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    chart
        .draw_series(LineSeries::new(
            xs.iter().cloned().zip(var.predicted.iter().cloned()),
            &RED,
        ))?
        .label("predict")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    let (_, err_hi) = value_range(&var.abs_error);
    let mut chart = ChartBuilder::on(&right)
        .caption(format!("|error| {}", var.name), ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..err_hi.max(1e-12))?;
    chart.configure_mesh().x_desc(grid.names[0].as_str()).draw()?;
    chart.draw_series(LineSeries::new(
        xs.iter().cloned().zip(var.abs_error.iter().cloned()),
        &BLACK,
    ))?;
    root.present()?;
    Ok(())
}
