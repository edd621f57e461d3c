/*!
# Profit Change Reporter

Loads a table of prescription claims, derives the per-row change in net
profit, and presents it filtered by insurance carrier and insurance class.

## Overview

Each row of the input carries a carrier (`Ins`), an insurance class, the
net profit of the first period (`Net Profit`) and the best observed profit
of the second period (`Highest Net Profit`). The reporter computes

```text
Net Profit Change = Highest Net Profit - Net Profit
```

for every row, lets the user pick one carrier and one class, and shows the
matching rows together with charts, descriptive statistics and dataset-wide
grand totals.

## Pipeline

1. **loader**: reads a CSV or Excel/ODS workbook into a [`loader::RawTable`]
2. **schema**: checks that every required column is present
3. **dataset**: normalizes rows into [`record::Record`]s, drops rows
   without a carrier and answers carrier/class queries
4. **report**: builds the table, summary and totals for a selection
5. **graph**: prepares and draws the charts with plotters
6. **downloader**: exports the filtered table as CSV or XLSX
7. **app**: the axum dashboard (feature `web`, enabled by default)

## Variants

- **Minimal**: `Ins`, `class`, `Net Profit`, `Highest Net Profit`
- **Extended**: additionally `Script`, `NDC`, `NDC for Highest Net Profit`
  and `Prescriber`, which unlock per-prescriber and per-NDC sums

## Statistics

Sums, means and medians skip missing (NaN) values. The standard deviation is
the sample standard deviation (N - 1), NaN for fewer than two values. Empty
subsets are not errors: they produce empty tables and NaN statistics.

## REST API Endpoints

- `/` - Dashboard page, query `ins` and `class`
- `/api/carriers` - Sorted carriers
- `/api/classes?ins=` - Sorted classes of a carrier
- `/api/report?ins=&class=` - Report as JSON
- `/chart/{kind}?ins=&class=` - Chart as PNG
- `/api/export?ins=&class=&format=` - Filtered table as CSV or XLSX
*/

pub mod config;
pub mod dataset;
pub mod downloader;
pub mod error;
pub mod graph;
pub mod loader;
pub mod record;
pub mod report;
pub mod schema;
pub mod stats;

#[cfg(feature = "web")]
pub mod app;

pub use config::SourceConfig;
pub use dataset::{Dataset, Selection};
pub use downloader::{ExportFormat, export_to_file};
pub use error::ReportError;
pub use graph::{ChartData, ChartKind, GraphOptions};
pub use record::{Record, Variant};
pub use report::{Report, TableRow};
pub use stats::{ChangeSummary, GrandTotals, GroupTotal};
