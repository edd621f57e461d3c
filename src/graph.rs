use crate::dataset::{Dataset, Selection};
use crate::error::ReportError;
use crate::record::{Record, Variant};
use crate::report::grouped_profit;
use crate::stats::{self, Bin, GroupTotal};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Number of buckets in the change distribution histogram
pub const HISTOGRAM_BINS: usize = 20;

const HEADROOM: f64 = 0.10;

/// The charts the report can draw
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    /// Grouped bars of Net Profit and Highest Net Profit per class
    ProfitComparison,

    /// Histogram of Net Profit Change
    ChangeDistribution,

    /// Net Profit Change summed per carrier
    ChangeByCarrier,

    /// Box plot of Net Profit Change per class
    ChangeByClass,

    /// Net Profit summed per prescriber (extended variant only)
    ProfitByPrescriber,

    /// Net Profit summed per NDC code (extended variant only)
    ProfitByNdc,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::ProfitComparison,
        ChartKind::ChangeDistribution,
        ChartKind::ChangeByCarrier,
        ChartKind::ChangeByClass,
        ChartKind::ProfitByPrescriber,
        ChartKind::ProfitByNdc,
    ];

    /// Name used in URLs and file names
    pub fn slug(self) -> &'static str {
        match self {
            ChartKind::ProfitComparison => "profit-comparison",
            ChartKind::ChangeDistribution => "change-distribution",
            ChartKind::ChangeByCarrier => "change-by-carrier",
            ChartKind::ChangeByClass => "change-by-class",
            ChartKind::ProfitByPrescriber => "profit-by-prescriber",
            ChartKind::ProfitByNdc => "profit-by-ndc",
        }
    }

    pub fn from_slug(slug: &str) -> Result<Self, ReportError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == slug)
            .ok_or_else(|| ReportError::UnknownChart(slug.to_string()))
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::ProfitComparison => "Net Profit Before vs. After per Class",
            ChartKind::ChangeDistribution => "Distribution of Net Profit Change",
            ChartKind::ChangeByCarrier => "Net Profit Change per INS",
            ChartKind::ChangeByClass => "Net Profit Change Distribution per Class",
            ChartKind::ProfitByPrescriber => "Net Profit by Prescriber",
            ChartKind::ProfitByNdc => "Net Profit by NDC",
        }
    }

    pub fn requires_extended(self) -> bool {
        matches!(self, ChartKind::ProfitByPrescriber | ChartKind::ProfitByNdc)
    }

    /// Charts that can be drawn for a dataset of the given variant
    pub fn available_for(variant: Variant) -> Vec<ChartKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| variant.is_extended() || !kind.requires_extended())
            .collect()
    }

    fn axis_labels(self) -> (&'static str, &'static str) {
        match self {
            ChartKind::ProfitComparison => ("class", "Net Profit"),
            ChartKind::ChangeDistribution => ("Net Profit Change", "count"),
            ChartKind::ChangeByCarrier => ("Ins", "Change in Net Profit"),
            ChartKind::ChangeByClass => ("class", "Net Profit Change"),
            ChartKind::ProfitByPrescriber => ("Prescriber", "Net Profit"),
            ChartKind::ProfitByNdc => ("NDC", "Net Profit"),
        }
    }
}

/// Configuration options for graph generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Graph".to_string(),
            x_label: "X Axis".to_string(),
            y_label: "Y Axis".to_string(),
            width: 800,
            height: 600,
        }
    }
}

impl GraphOptions {
    /// Title and axis labels for `kind` at the given size
    pub fn for_kind(kind: ChartKind, width: u32, height: u32) -> Self {
        let (x_label, y_label) = kind.axis_labels();
        Self {
            title: kind.title().to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            width,
            height,
        }
    }
}

/// Values behind one chart, independent of how it is drawn
#[derive(Clone, Debug, PartialEq)]
pub enum ChartData {
    Bars(Vec<GroupTotal>),
    GroupedBars {
        series: [&'static str; 2],
        groups: Vec<(String, f64, f64)>,
    },
    Histogram(Vec<Bin>),
    BoxPlot(Vec<(String, Vec<f64>)>),
}

impl ChartData {
    /// Collect the data for `kind` over the records matching `selection`
    ///
    /// With no selection the chart is drawn empty.
    pub fn prepare(
        dataset: &Dataset,
        selection: Option<&Selection>,
        kind: ChartKind,
    ) -> Result<Self, ReportError> {
        if kind.requires_extended() && !dataset.variant().is_extended() {
            return Err(ReportError::ChartUnavailable(kind.slug()));
        }

        let records: Vec<&Record> = selection.map(|s| dataset.filter(s)).unwrap_or_default();
        debug!("preparing {} over {} records", kind.slug(), records.len());

        let data = match kind {
            ChartKind::ProfitComparison => {
                let mut per_class: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
                for record in &records {
                    let entry = per_class.entry(record.class.as_str()).or_default();
                    entry.0.push(record.net_profit);
                    entry.1.push(record.highest_net_profit);
                }
                ChartData::GroupedBars {
                    series: ["Net Profit", "Highest Net Profit"],
                    groups: per_class
                        .into_iter()
                        .map(|(class, (net, highest))| {
                            (class.to_string(), stats::sum(&net), stats::sum(&highest))
                        })
                        .collect(),
                }
            }
            ChartKind::ChangeDistribution => {
                let changes: Vec<f64> = records.iter().map(|r| r.net_profit_change()).collect();
                ChartData::Histogram(stats::histogram(&changes, HISTOGRAM_BINS))
            }
            ChartKind::ChangeByCarrier => ChartData::Bars(stats::group_sum(
                records.iter().copied(),
                |r| Some(r.ins.as_str()),
                |r| r.net_profit_change(),
            )),
            ChartKind::ChangeByClass => {
                let mut per_class: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
                for record in &records {
                    let change = record.net_profit_change();
                    let values = per_class.entry(record.class.as_str()).or_default();
                    if change.is_finite() {
                        values.push(change);
                    }
                }
                ChartData::BoxPlot(
                    per_class
                        .into_iter()
                        .map(|(class, values)| (class.to_string(), values))
                        .collect(),
                )
            }
            ChartKind::ProfitByPrescriber => ChartData::Bars(grouped_profit(&records).by_prescriber),
            ChartKind::ProfitByNdc => ChartData::Bars(grouped_profit(&records).by_ndc),
        };
        Ok(data)
    }

    /// Draw onto any plotters backend
    pub fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        options: &GraphOptions,
    ) -> Result<(), ReportError> {
        match self {
            ChartData::Bars(bars) => draw_bars(root, bars, options),
            ChartData::GroupedBars { series, groups } => {
                draw_grouped_bars(root, series, groups, options)
            }
            ChartData::Histogram(bins) => draw_histogram(root, bins, options),
            ChartData::BoxPlot(groups) => draw_box_plot(root, groups, options),
        }
    }
}

/// Render a chart to PNG bytes in memory
pub fn render_png(data: &ChartData, options: &GraphOptions) -> Result<Vec<u8>, ReportError> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        data.draw(&root, options)?;
        root.present()?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| ReportError::Chart("bitmap buffer does not match chart size".into()))?;
    let mut png = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .map_err(|e| ReportError::Chart(e.to_string()))?;
    Ok(png.into_inner())
}

/// Render a chart straight to a PNG file
pub fn save_png(
    data: &ChartData,
    options: &GraphOptions,
    path: impl AsRef<Path>,
) -> Result<(), ReportError> {
    let root = BitMapBackend::new(path.as_ref(), (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;
    data.draw(&root, options)?;
    root.present()?;
    Ok(())
}

/// Write every chart available for the dataset into `dir`
///
/// Returns the chart kinds with the paths they were written to.
pub fn save_all(
    dataset: &Dataset,
    selection: Option<&Selection>,
    dir: impl AsRef<Path>,
    width: u32,
    height: u32,
) -> Result<Vec<(ChartKind, PathBuf)>, ReportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for kind in ChartKind::available_for(dataset.variant()) {
        let data = ChartData::prepare(dataset, selection, kind)?;
        let path = dir.join(format!("{}.png", kind.slug()));
        save_png(&data, &GraphOptions::for_kind(kind, width, height), &path)?;
        written.push((kind, path));
    }
    Ok(written)
}

/// Y range covering zero and every finite value, with some headroom
fn value_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (mut low, mut high) = (0.0f64, 0.0f64);
    for v in values.into_iter().filter(|v| v.is_finite()) {
        low = low.min(v);
        high = high.max(v);
    }
    if low == high {
        return low - 1.0..high + 1.0;
    }
    let pad = (high - low) * HEADROOM;
    let low = if low < 0.0 { low - pad } else { low };
    low..high + pad
}

fn segment_label(value: &SegmentValue<i32>, labels: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => labels
            .get(*i as usize)
            .cloned()
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    bars: &[GroupTotal],
    options: &GraphOptions,
) -> Result<(), ReportError> {
    let labels: Vec<String> = bars.iter().map(|b| b.key.clone()).collect();
    let segments = bars.len().max(1) as i32;

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..segments).into_segmented(),
            value_range(bars.iter().map(|b| b.total)),
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .x_labels(segments as usize)
        .x_label_formatter(&|x| segment_label(x, &labels))
        .draw()?;

    chart.draw_series(
        bars.iter()
            .enumerate()
            .filter(|(_, b)| b.total.is_finite())
            .map(|(i, b)| {
                let i = i as i32;
                let color = if b.total >= 0.0 { BLUE } else { RED };
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), b.total)],
                    color.filled(),
                );
                bar.set_margin(0, 0, 5, 5);
                bar
            }),
    )?;

    Ok(())
}

fn draw_grouped_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &[&'static str; 2],
    groups: &[(String, f64, f64)],
    options: &GraphOptions,
) -> Result<(), ReportError> {
    let labels: Vec<String> = groups.iter().map(|g| g.0.clone()).collect();
    let segments = groups.len().max(1) as i32;

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..segments).into_segmented(),
            value_range(groups.iter().flat_map(|g| [g.1, g.2])),
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .x_labels(segments as usize)
        .x_label_formatter(&|x| segment_label(x, &labels))
        .draw()?;

    // Each segment holds both bars: the first keeps its left half, the
    // second its right half.
    let half = chart.plotting_area().dim_in_pixel().0 / (2 * segments as u32);
    let styles = [BLUE, GREEN];
    for (series_index, name) in series.iter().enumerate() {
        let color = styles[series_index];
        let (left, right) = if series_index == 0 { (4, half) } else { (half, 4) };
        chart
            .draw_series(
                groups
                    .iter()
                    .enumerate()
                    .map(|(i, g)| (i as i32, if series_index == 0 { g.1 } else { g.2 }))
                    .filter(|(_, v)| v.is_finite())
                    .map(move |(i, v)| {
                        let mut bar = Rectangle::new(
                            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
                            color.filled(),
                        );
                        bar.set_margin(0, 0, left, right);
                        bar
                    }),
            )?
            .label(*name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    bins: &[Bin],
    options: &GraphOptions,
) -> Result<(), ReportError> {
    let x_range = match (bins.first(), bins.last()) {
        (Some(first), Some(last)) => first.start..last.end,
        _ => 0.0..1.0,
    };
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0) as u32;

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0u32..max_count + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    chart.draw_series(bins.iter().map(|b| {
        let mut bar = Rectangle::new([(b.start, 0u32), (b.end, b.count as u32)], BLUE.mix(0.8).filled());
        bar.set_margin(0, 0, 1, 1);
        bar
    }))?;

    Ok(())
}

fn draw_box_plot<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    groups: &[(String, Vec<f64>)],
    options: &GraphOptions,
) -> Result<(), ReportError> {
    let labels: Vec<String> = groups.iter().map(|g| g.0.clone()).collect();
    let segments = groups.len().max(1) as i32;
    let range = value_range(groups.iter().flat_map(|g| g.1.iter().copied()));

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..segments).into_segmented(),
            range.start as f32..range.end as f32,
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .x_labels(segments as usize)
        .x_label_formatter(&|x| segment_label(x, &labels))
        .draw()?;

    chart.draw_series(
        groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.1.is_empty())
            .map(|(i, g)| {
                Boxplot::new_vertical(SegmentValue::CenterOf(i as i32), &Quartiles::new(g.1.as_slice()))
                    .width(30)
                    .style(BLUE)
            }),
    )?;

    Ok(())
}
