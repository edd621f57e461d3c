use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use handlebars::Handlebars;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::dataset::{Dataset, Selection};
use crate::downloader::{self, ExportFormat};
use crate::error::ReportError;
use crate::graph::{self, ChartData, ChartKind, GraphOptions};
use crate::report::{Report, TableRow, display_value};
use crate::stats::GroupTotal;

const DASHBOARD: &str = "dashboard";

/// Shared, read-only state behind every request
pub struct AppState {
    dataset: Dataset,
    templates: Handlebars<'static>,
    chart_size: (u32, u32),
}

impl AppState {
    pub fn new(dataset: Dataset) -> Result<Self, ReportError> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string(DASHBOARD, include_str!("./static/dashboard.hbs"))
            .map_err(|e| ReportError::Template(e.to_string()))?;

        let defaults = GraphOptions::default();
        Ok(AppState {
            dataset,
            templates,
            chart_size: (defaults.width, defaults.height),
        })
    }

    pub fn with_chart_size(mut self, width: u32, height: u32) -> Self {
        self.chart_size = (width, height);
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

#[derive(Deserialize, Default)]
struct SelectionQuery {
    ins: Option<String>,
    class: Option<String>,
}

impl SelectionQuery {
    fn resolve(&self, dataset: &Dataset) -> Option<Selection> {
        dataset.select(self.ins.as_deref(), self.class.as_deref())
    }
}

#[derive(Deserialize)]
struct ClassesQuery {
    ins: String,
}

#[derive(Deserialize)]
struct ExportQuery {
    ins: Option<String>,
    class: Option<String>,
    format: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: String,
}

/// A [`ReportError`] rendered as a JSON error response
struct ApiError(ReportError);

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ReportError::UnknownChart(_) | ReportError::ChartUnavailable(_) => StatusCode::NOT_FOUND,
            ReportError::Export(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }

        let body = StatusResponse {
            status: "error".to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Routes of the dashboard and its JSON/PNG endpoints
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/carriers", get(get_carriers))
        .route("/api/classes", get(get_classes))
        .route("/api/report", get(get_report))
        .route("/api/export", get(export_table))
        .route("/chart/:kind", get(get_chart))
        .with_state(state)
}

/// Serve the dashboard until the process is stopped
pub async fn run(state: AppState, addr: SocketAddr) -> Result<(), ReportError> {
    let app = router(Arc::new(state));

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, ApiError> {
    let selection = query.resolve(&state.dataset);
    let report = Report::build(&state.dataset, selection.as_ref());

    let page = state
        .templates
        .render(DASHBOARD, &dashboard_context(&report, state.dataset.dropped_rows()))
        .map_err(|e| ReportError::Template(e.to_string()))?;
    Ok(Html(page))
}

async fn get_carriers(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(
        state
            .dataset
            .carriers()
            .into_iter()
            .map(String::from)
            .collect(),
    )
}

async fn get_classes(
    Query(query): Query<ClassesQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<String>> {
    Json(
        state
            .dataset
            .classes_for(&query.ins)
            .into_iter()
            .map(String::from)
            .collect(),
    )
}

async fn get_report(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<Report> {
    let selection = query.resolve(&state.dataset);
    Json(Report::build(&state.dataset, selection.as_ref()))
}

async fn get_chart(
    Path(kind): Path<String>,
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let kind = ChartKind::from_slug(&kind)?;
    let selection = query.resolve(&state.dataset);
    let data = ChartData::prepare(&state.dataset, selection.as_ref(), kind)?;

    let (width, height) = state.chart_size;
    let options = GraphOptions::for_kind(kind, width, height);
    let png = tokio::task::spawn_blocking(move || graph::render_png(&data, &options))
        .await
        .map_err(|e| ReportError::Chart(e.to_string()))??;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn export_table(
    Query(query): Query<ExportQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let format = match query.format.as_deref() {
        None => ExportFormat::Csv,
        Some(name) => ExportFormat::from_name(name)
            .ok_or_else(|| ReportError::Export(format!("unknown export format '{name}'")))?,
    };

    let dataset = &state.dataset;
    let rows: Vec<TableRow> = dataset
        .select(query.ins.as_deref(), query.class.as_deref())
        .map(|s| dataset.filter(&s).into_iter().map(TableRow::from).collect())
        .unwrap_or_default();

    let body = match format {
        ExportFormat::Csv => downloader::to_csv(&rows, dataset.variant())?.into_bytes(),
        ExportFormat::Xlsx => downloader::to_xlsx(&rows, dataset.variant())?,
    };
    let disposition = format!(
        "attachment; filename=\"profit_changes.{}\"",
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

fn selection_query(selection: &Selection) -> String {
    format!(
        "ins={}&class={}",
        urlencoding::encode(&selection.ins),
        urlencoding::encode(&selection.class)
    )
}

fn options(values: &[String], selected: Option<&str>) -> Vec<Value> {
    values
        .iter()
        .map(|value| json!({ "value": value, "selected": Some(value.as_str()) == selected }))
        .collect()
}

fn dashboard_context(report: &Report, dropped_rows: usize) -> Value {
    let selection = report.selection.as_ref();
    let query = selection.map(selection_query).unwrap_or_default();

    let rows: Vec<Value> = report
        .rows
        .iter()
        .map(|row| {
            json!({
                "script": row.script,
                "ndc": row.ndc,
                "ndc_for_highest": row.ndc_for_highest,
                "prescriber": row.prescriber,
                "ins": row.ins,
                "class": row.class,
                "net_profit": display_value(row.net_profit),
                "highest_net_profit": display_value(row.highest_net_profit),
                "net_profit_change": display_value(row.net_profit_change),
            })
        })
        .collect();

    let charts: Vec<Value> = ChartKind::available_for(report.variant)
        .into_iter()
        .map(|kind| {
            json!({
                "title": kind.title(),
                "url": format!("/chart/{}?{}", kind.slug(), query),
            })
        })
        .collect();

    let groups = |totals: &[GroupTotal]| -> Vec<Value> {
        totals
            .iter()
            .map(|g| json!({ "key": g.key, "total": display_value(g.total) }))
            .collect()
    };

    json!({
        "has_selection": selection.is_some(),
        "ins": selection.map(|s| s.ins.as_str()),
        "class": selection.map(|s| s.class.as_str()),
        "carriers": options(&report.carriers, selection.map(|s| s.ins.as_str())),
        "classes": options(&report.classes, selection.map(|s| s.class.as_str())),
        "extended": report.variant.is_extended(),
        "rows": rows,
        "charts": charts,
        "summary": {
            "mean": display_value(report.summary.mean),
            "median": display_value(report.summary.median),
            "std_dev": display_value(report.summary.std_dev),
        },
        "totals": {
            "net_profit": display_value(report.totals.net_profit),
            "highest_net_profit": display_value(report.totals.highest_net_profit),
            "change": display_value(report.totals.change),
        },
        "by_prescriber": report.grouped.as_ref().map(|g| groups(&g.by_prescriber)),
        "by_ndc": report.grouped.as_ref().map(|g| groups(&g.by_ndc)),
        "export_csv": format!("/api/export?{query}&format=csv"),
        "export_xlsx": format!("/api/export?{query}&format=xlsx"),
        "dropped_rows": dropped_rows,
        "generated_at": report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}
