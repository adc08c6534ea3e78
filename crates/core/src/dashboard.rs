use crate::client::{MarketDataClient, TransportError};
use crate::endpoint::{api_notice, Endpoint, Layout, QueryParams, Selection};
use crate::normalize::{normalize, NormalizationError, NormalizedTable};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const TITLE: &str = "Financial Data Dashboard (Alpha Vantage)";

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("error while fetching data: {0}")]
    Transport(#[from] TransportError),

    #[error("{endpoint}: {source}")]
    Shape {
        endpoint: Endpoint,
        #[source]
        source: NormalizationError,
        notice: Option<String>,
        raw: Value,
    },

    #[error("{endpoint}: response contained no data")]
    NoData {
        endpoint: Endpoint,
        notice: Option<String>,
        raw: Value,
    },
}

impl DashboardError {
    /// Raw payload to show for inspection, when one was received.
    pub fn raw(&self) -> Option<&Value> {
        match self {
            DashboardError::Transport(_) => None,
            DashboardError::Shape { raw, .. } | DashboardError::NoData { raw, .. } => Some(raw),
        }
    }

    pub fn notice(&self) -> Option<&str> {
        match self {
            DashboardError::Transport(_) => None,
            DashboardError::Shape { notice, .. } | DashboardError::NoData { notice, .. } => {
                notice.as_deref()
            }
        }
    }

    /// Short advice for the user, in the wording of the endpoint's sidebar.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            DashboardError::Transport(_) => None,
            DashboardError::Shape { endpoint, .. } | DashboardError::NoData { endpoint, .. } => {
                Some(endpoint.def().hint)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub column: String,
    /// `(row key, value)` in ascending key order; `None` marks a missing value.
    pub points: Vec<(String, Option<f64>)>,
}

/// Everything a display collaborator needs for one action.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub endpoint: Endpoint,
    pub title: &'static str,
    pub subtitle: String,
    pub index_label: &'static str,
    pub layout: Layout,
    pub total_rows: usize,
    pub table: NormalizedTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

pub struct Dashboard<C> {
    client: C,
}

impl<C: MarketDataClient> Dashboard<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn run(&self, selection: &Selection) -> Result<View, DashboardError> {
        let endpoint = selection.endpoint;
        tracing::info!(
            provider = self.client.provider_name(),
            function = %endpoint,
            "{}",
            endpoint.progress_message(&selection.params)
        );

        let raw = self.client.fetch(endpoint, &selection.params).await?;
        let view = build_view(endpoint, &selection.params, raw)?;

        tracing::info!(
            function = %endpoint,
            rows = view.total_rows,
            columns = view.table.columns().len(),
            "normalized response"
        );
        Ok(view)
    }
}

/// Normalizes one response and attaches the endpoint's presentation.
pub fn build_view(
    endpoint: Endpoint,
    params: &QueryParams,
    raw: Value,
) -> Result<View, DashboardError> {
    let def = endpoint.def();

    if let Some(field) = def.identity_field {
        if raw.get(field).and_then(Value::as_str) != Some(params.symbol.as_str()) {
            return Err(DashboardError::NoData {
                endpoint,
                notice: api_notice(&raw),
                raw,
            });
        }
    }

    let table = match normalize(&raw, &def.shape) {
        Ok(table) => table,
        Err(source) => {
            tracing::warn!(function = %endpoint, error = %source, "unexpected response shape");
            return Err(DashboardError::Shape {
                endpoint,
                source,
                notice: api_notice(&raw),
                raw,
            });
        }
    };

    if table.is_empty() || table.columns().is_empty() {
        return Err(DashboardError::NoData {
            endpoint,
            notice: api_notice(&raw),
            raw,
        });
    }

    let chart = def.chart_column.and_then(|col| chart_series(&table, col));
    let caption = endpoint.caption(params, &table);
    let description = (endpoint == Endpoint::Overview).then(|| {
        raw.get("Description")
            .and_then(Value::as_str)
            .unwrap_or("No description available.")
            .to_string()
    });

    let total_rows = table.len();
    let table = match def.row_limit {
        Some(n) => table.head(n),
        None => table,
    };

    Ok(View {
        endpoint,
        title: TITLE,
        subtitle: format!("{}: {}", def.subtitle, endpoint),
        index_label: match def.layout {
            Layout::Rows => def.index_label,
            Layout::Transposed => "Field",
        },
        layout: def.layout,
        total_rows,
        table,
        chart,
        caption,
        description,
        fetched_at: Utc::now(),
    })
}

fn chart_series(table: &NormalizedTable, column: &str) -> Option<ChartSeries> {
    let values = table.column(column)?;
    let mut points: Vec<(String, Option<f64>)> = table
        .rows()
        .iter()
        .map(|r| r.key.clone())
        .zip(values)
        .collect();
    // Keys are ISO dates, so lexical order is chronological.
    points.sort_by(|a, b| a.0.cmp(&b.0));
    Some(ChartSeries {
        column: column.to_string(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Selection;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeClient {
        response: Mutex<Option<Result<Value, TransportError>>>,
        calls: Mutex<Vec<Endpoint>>,
    }

    impl FakeClient {
        fn returning(response: Result<Value, TransportError>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataClient for FakeClient {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch(
            &self,
            endpoint: Endpoint,
            _params: &QueryParams,
        ) -> Result<Value, TransportError> {
            self.calls.lock().unwrap().push(endpoint);
            self.response
                .lock()
                .unwrap()
                .take()
                .expect("fake client called twice")
        }
    }

    fn daily_series(n: usize) -> Value {
        let mut series = serde_json::Map::new();
        for day in (1..=n).rev() {
            series.insert(
                format!("2024-02-{day:02}"),
                json!({"1. open": "10.0", "4. close": format!("{}.5", 100 + day), "5. volume": "1000"}),
            );
        }
        json!({"Meta Data": {}, "Time Series (Daily)": series})
    }

    #[tokio::test]
    async fn daily_view_is_trimmed_and_charted() {
        let dashboard = Dashboard::new(FakeClient::returning(Ok(daily_series(25))));
        let view = dashboard
            .run(&Selection::new(Endpoint::TimeSeriesDaily))
            .await
            .unwrap();

        assert_eq!(view.total_rows, 25);
        assert_eq!(view.table.len(), 20);
        assert_eq!(view.table.rows()[0].key, "2024-02-25");
        assert_eq!(view.subtitle, "Stock Price History: TIME_SERIES_DAILY");
        assert_eq!(view.index_label, "Date");

        let chart = view.chart.unwrap();
        assert_eq!(chart.column, "close");
        assert_eq!(chart.points.len(), 25);
        assert_eq!(chart.points[0], ("2024-02-01".to_string(), Some(101.5)));
        assert_eq!(dashboard.client().calls.lock().unwrap().as_slice(), [Endpoint::TimeSeriesDaily]);
    }

    #[tokio::test]
    async fn transport_failure_is_not_a_shape_failure() {
        let err = TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        let dashboard = Dashboard::new(FakeClient::returning(Err(err)));
        let res = dashboard.run(&Selection::new(Endpoint::GlobalQuote)).await;
        assert!(matches!(res, Err(DashboardError::Transport(_))));
    }

    #[tokio::test]
    async fn error_payload_is_reported_with_raw_body() {
        let raw = json!({"Error Message": "Invalid API call. Please retry or visit the documentation."});
        let dashboard = Dashboard::new(FakeClient::returning(Ok(raw.clone())));
        let err = dashboard
            .run(&Selection::new(Endpoint::Sma))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DashboardError::Shape {
                source: NormalizationError::MissingContainer { .. },
                ..
            }
        ));
        assert_eq!(err.raw(), Some(&raw));
        assert!(err.notice().unwrap().starts_with("Invalid API call"));
        assert_eq!(err.hint(), Some("Could not calculate SMA. Check parameters."));
    }

    #[test]
    fn empty_quote_is_no_data() {
        let params = QueryParams::defaults_for(Endpoint::GlobalQuote);
        let err = build_view(Endpoint::GlobalQuote, &params, json!({"Global Quote": {}})).unwrap_err();
        assert!(matches!(err, DashboardError::NoData { .. }));
    }

    #[test]
    fn overview_must_echo_the_symbol() {
        let params = QueryParams::defaults_for(Endpoint::Overview);
        let err = build_view(Endpoint::Overview, &params, json!({})).unwrap_err();
        assert!(matches!(err, DashboardError::NoData { .. }));

        let raw = json!({"Symbol": "MSFT", "Name": "Microsoft", "Description": "Software."});
        let view = build_view(Endpoint::Overview, &params, raw).unwrap();
        assert_eq!(view.description.as_deref(), Some("Software."));
        assert_eq!(view.layout, Layout::Transposed);
        assert_eq!(view.index_label, "Field");
    }

    #[test]
    fn income_statement_caption_counts_all_reports() {
        let params = QueryParams::defaults_for(Endpoint::IncomeStatement);
        let raw = json!({"annualReports": [
            {"fiscalDateEnding": "2023-06-30", "netIncome": "1"},
            {"fiscalDateEnding": "2022-06-30", "netIncome": "2"},
            {"fiscalDateEnding": "2021-06-30", "netIncome": "3"},
        ]});
        let view = build_view(Endpoint::IncomeStatement, &params, raw).unwrap();
        assert_eq!(
            view.caption.as_deref(),
            Some("Showing the last 3 annual income statements.")
        );
        assert!(view.chart.is_none());
    }

    #[test]
    fn view_serializes_for_display() {
        let params = QueryParams::defaults_for(Endpoint::Rsi);
        let raw = json!({"Technical Analysis: RSI": {"2024-01-02": {"RSI": "n/a"}, "2024-01-01": {"RSI": "48.5"}}});
        let view = build_view(Endpoint::Rsi, &params, raw).unwrap();
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["endpoint"], "RSI");
        assert_eq!(v["table"]["rows"][0]["cells"][0], Value::Null);
        assert_eq!(v["chart"]["points"][0], json!(["2024-01-01", 48.5]));
    }
}
