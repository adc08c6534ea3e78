//! The fixed menu of Alpha Vantage functions and how each one is queried,
//! normalized and presented.

pub mod params;

pub use params::{Interval, OutputSize, Param, ParamError, QueryParams, SeriesType, Selection};

use crate::normalize::{EndpointShape, NormalizedTable};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    TimeSeriesDaily,
    GlobalQuote,
    SymbolSearch,
    Overview,
    IncomeStatement,
    Earnings,
    CurrencyExchangeRate,
    FxDaily,
    Sma,
    Rsi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "Time Series")]
    TimeSeries,
    Fundamentals,
    #[serde(rename = "Forex (FX)")]
    Forex,
    #[serde(rename = "Technical Indicators")]
    TechnicalIndicators,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Category::TimeSeries,
        Category::Fundamentals,
        Category::Forex,
        Category::TechnicalIndicators,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::TimeSeries => "Time Series",
            Category::Fundamentals => "Fundamentals",
            Category::Forex => "Forex (FX)",
            Category::TechnicalIndicators => "Technical Indicators",
        }
    }

    pub fn endpoints(self) -> impl Iterator<Item = Endpoint> {
        Endpoint::ALL
            .iter()
            .copied()
            .filter(move |e| e.category() == self)
    }
}

/// How a view lays out its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One line per row key (dates down the side).
    Rows,
    /// One line per field; used for quotes and statements.
    Transposed,
}

/// Registry entry for one API function.
#[derive(Debug, Clone, Copy)]
pub struct EndpointDef {
    pub category: Category,
    pub shape: EndpointShape,
    pub params: &'static [Param],
    pub series_types: &'static [SeriesType],
    pub default_symbol: &'static str,
    pub default_time_period: u32,
    pub subtitle: &'static str,
    pub index_label: &'static str,
    pub layout: Layout,
    pub chart_column: Option<&'static str>,
    pub row_limit: Option<usize>,
    /// Field that must echo the requested symbol for the response to count as data.
    pub identity_field: Option<&'static str>,
    pub hint: &'static str,
}

const ALL_SERIES: &[SeriesType] = &[
    SeriesType::Close,
    SeriesType::Open,
    SeriesType::High,
    SeriesType::Low,
];

const HEAD_ROWS: usize = 20;

const BASE: EndpointDef = EndpointDef {
    category: Category::TimeSeries,
    shape: EndpointShape::single_record(&[]),
    params: &[Param::Symbol],
    series_types: &[],
    default_symbol: "IBM",
    default_time_period: 20,
    subtitle: "",
    index_label: "Date",
    layout: Layout::Rows,
    chart_column: None,
    row_limit: None,
    identity_field: None,
    hint: "Check the symbol.",
};

const TIME_SERIES_DAILY: EndpointDef = EndpointDef {
    shape: EndpointShape::time_series(&["Time Series (Daily)"])
        .strip_prefixes()
        .coerce_numbers(),
    params: &[Param::Symbol, Param::OutputSize],
    subtitle: "Stock Price History",
    chart_column: Some("close"),
    row_limit: Some(HEAD_ROWS),
    hint: "Data structure was weird. Maybe the symbol is wrong?",
    ..BASE
};

const GLOBAL_QUOTE: EndpointDef = EndpointDef {
    shape: EndpointShape::single_record(&["Global Quote"]).strip_prefixes(),
    default_symbol: "AAPL",
    subtitle: "Current Quote",
    layout: Layout::Transposed,
    hint: "Could not fetch quote. Check symbol.",
    ..BASE
};

const SYMBOL_SEARCH: EndpointDef = EndpointDef {
    shape: EndpointShape::record_list(&["bestMatches"], "1. symbol").strip_prefixes(),
    params: &[Param::Keywords],
    subtitle: "Symbol Search",
    index_label: "symbol",
    hint: "No matches found. Try different keywords.",
    ..BASE
};

const OVERVIEW: EndpointDef = EndpointDef {
    category: Category::Fundamentals,
    default_symbol: "MSFT",
    subtitle: "Company Fundamentals",
    layout: Layout::Transposed,
    identity_field: Some("Symbol"),
    hint: "Could not fetch company overview. Check the symbol and API key.",
    ..BASE
};

const INCOME_STATEMENT: EndpointDef = EndpointDef {
    category: Category::Fundamentals,
    shape: EndpointShape::record_list(&["annualReports"], "fiscalDateEnding").coerce_numbers(),
    default_symbol: "MSFT",
    subtitle: "Company Financials",
    index_label: "fiscalDateEnding",
    layout: Layout::Transposed,
    hint: "Could not find annual reports. Check the ticker.",
    ..BASE
};

const EARNINGS: EndpointDef = EndpointDef {
    category: Category::Fundamentals,
    shape: EndpointShape::record_list(&["annualEarnings"], "fiscalDateEnding").coerce_numbers(),
    subtitle: "Company Earnings",
    index_label: "fiscalDateEnding",
    chart_column: Some("reportedEPS"),
    row_limit: Some(HEAD_ROWS),
    hint: "Could not find annual earnings. Check the ticker.",
    ..BASE
};

const CURRENCY_EXCHANGE_RATE: EndpointDef = EndpointDef {
    category: Category::Forex,
    shape: EndpointShape::single_record(&["Realtime Currency Exchange Rate"]).strip_prefixes(),
    params: &[Param::FromCurrency, Param::ToCurrency],
    subtitle: "Exchange Rate",
    layout: Layout::Transposed,
    hint: "Could not fetch the exchange rate. Check the currency codes.",
    ..BASE
};

const FX_DAILY: EndpointDef = EndpointDef {
    category: Category::Forex,
    shape: EndpointShape::time_series(&["Time Series FX (Daily)"])
        .strip_prefixes()
        .coerce_numbers(),
    params: &[Param::FromCurrency, Param::ToCurrency, Param::OutputSize],
    subtitle: "FX Rate History",
    chart_column: Some("close"),
    row_limit: Some(HEAD_ROWS),
    hint: "Could not fetch FX history. Check the currency codes.",
    ..BASE
};

const INDICATOR_PARAMS: &[Param] = &[
    Param::Symbol,
    Param::Interval,
    Param::TimePeriod,
    Param::SeriesType,
];

const SMA: EndpointDef = EndpointDef {
    category: Category::TechnicalIndicators,
    shape: EndpointShape::time_series(&["Technical Analysis: SMA"]).coerce_numbers(),
    params: INDICATOR_PARAMS,
    series_types: ALL_SERIES,
    default_symbol: "TSLA",
    default_time_period: 20,
    subtitle: "Technical Indicator (Simple Moving Average)",
    chart_column: Some("SMA"),
    row_limit: Some(HEAD_ROWS),
    hint: "Could not calculate SMA. Check parameters.",
    ..BASE
};

const RSI: EndpointDef = EndpointDef {
    category: Category::TechnicalIndicators,
    shape: EndpointShape::time_series(&["Technical Analysis: RSI"]).coerce_numbers(),
    params: INDICATOR_PARAMS,
    series_types: &[SeriesType::Close],
    default_symbol: "GOOGL",
    default_time_period: 14,
    subtitle: "Technical Indicator (Relative Strength Index)",
    chart_column: Some("RSI"),
    row_limit: Some(HEAD_ROWS),
    hint: "Could not calculate RSI. Check parameters.",
    ..BASE
};

impl Endpoint {
    pub const ALL: &'static [Endpoint] = &[
        Endpoint::TimeSeriesDaily,
        Endpoint::GlobalQuote,
        Endpoint::SymbolSearch,
        Endpoint::Overview,
        Endpoint::IncomeStatement,
        Endpoint::Earnings,
        Endpoint::CurrencyExchangeRate,
        Endpoint::FxDaily,
        Endpoint::Sma,
        Endpoint::Rsi,
    ];

    /// The API `function` parameter.
    pub fn function(self) -> &'static str {
        match self {
            Endpoint::TimeSeriesDaily => "TIME_SERIES_DAILY",
            Endpoint::GlobalQuote => "GLOBAL_QUOTE",
            Endpoint::SymbolSearch => "SYMBOL_SEARCH",
            Endpoint::Overview => "OVERVIEW",
            Endpoint::IncomeStatement => "INCOME_STATEMENT",
            Endpoint::Earnings => "EARNINGS",
            Endpoint::CurrencyExchangeRate => "CURRENCY_EXCHANGE_RATE",
            Endpoint::FxDaily => "FX_DAILY",
            Endpoint::Sma => "SMA",
            Endpoint::Rsi => "RSI",
        }
    }

    pub fn def(self) -> &'static EndpointDef {
        match self {
            Endpoint::TimeSeriesDaily => &TIME_SERIES_DAILY,
            Endpoint::GlobalQuote => &GLOBAL_QUOTE,
            Endpoint::SymbolSearch => &SYMBOL_SEARCH,
            Endpoint::Overview => &OVERVIEW,
            Endpoint::IncomeStatement => &INCOME_STATEMENT,
            Endpoint::Earnings => &EARNINGS,
            Endpoint::CurrencyExchangeRate => &CURRENCY_EXCHANGE_RATE,
            Endpoint::FxDaily => &FX_DAILY,
            Endpoint::Sma => &SMA,
            Endpoint::Rsi => &RSI,
        }
    }

    pub fn category(self) -> Category {
        self.def().category
    }

    pub fn shape(self) -> &'static EndpointShape {
        &self.def().shape
    }

    /// Query parameters in request order, without the API key.
    pub fn query_pairs(self, params: &QueryParams) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("function", self.function().to_string())];
        match self {
            Endpoint::TimeSeriesDaily => {
                pairs.push(("symbol", params.symbol.clone()));
                pairs.push(("outputsize", params.output_size.to_string()));
            }
            Endpoint::GlobalQuote
            | Endpoint::Overview
            | Endpoint::IncomeStatement
            | Endpoint::Earnings => pairs.push(("symbol", params.symbol.clone())),
            Endpoint::SymbolSearch => pairs.push(("keywords", params.keywords.clone())),
            Endpoint::CurrencyExchangeRate => {
                pairs.push(("from_currency", params.from_currency.clone()));
                pairs.push(("to_currency", params.to_currency.clone()));
            }
            Endpoint::FxDaily => {
                pairs.push(("from_symbol", params.from_currency.clone()));
                pairs.push(("to_symbol", params.to_currency.clone()));
                pairs.push(("outputsize", params.output_size.to_string()));
            }
            Endpoint::Sma | Endpoint::Rsi => {
                pairs.push(("symbol", params.symbol.clone()));
                pairs.push(("interval", params.interval.to_string()));
                pairs.push(("time_period", params.time_period.to_string()));
                pairs.push(("series_type", params.series_type.to_string()));
            }
        }
        pairs
    }

    /// What the user is told while the request is in flight.
    pub fn progress_message(self, params: &QueryParams) -> String {
        let sym = &params.symbol;
        match self {
            Endpoint::TimeSeriesDaily => format!("Getting daily prices for {sym}"),
            Endpoint::GlobalQuote => format!("Fetching real-time quote for {sym}"),
            Endpoint::SymbolSearch => format!("Searching symbols matching '{}'", params.keywords),
            Endpoint::Overview => format!("Fetching overview for {sym}"),
            Endpoint::IncomeStatement => format!("Downloading income statements for {sym}"),
            Endpoint::Earnings => format!("Downloading earnings for {sym}"),
            Endpoint::CurrencyExchangeRate => format!(
                "Fetching {}/{} exchange rate",
                params.from_currency, params.to_currency
            ),
            Endpoint::FxDaily => format!(
                "Getting daily {}/{} rates",
                params.from_currency, params.to_currency
            ),
            Endpoint::Sma | Endpoint::Rsi => format!(
                "Calculating {}-period {} for {sym}",
                params.time_period,
                self.function()
            ),
        }
    }

    /// Footnote shown under the table, computed from the full (untrimmed) table.
    pub fn caption(self, params: &QueryParams, table: &NormalizedTable) -> Option<String> {
        match self {
            Endpoint::IncomeStatement => Some(format!(
                "Showing the last {} annual income statements.",
                table.len()
            )),
            Endpoint::Sma => Some(format!(
                "The chart shows the {}-{} Simple Moving Average.",
                params.time_period,
                interval_unit(params.interval)
            )),
            Endpoint::Rsi => Some(
                "RSI values typically range from 0 to 100. Values below 30 suggest the asset \
                 might be oversold, and values above 70 suggest it might be overbought."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

fn interval_unit(interval: Interval) -> &'static str {
    match interval {
        Interval::Daily => "day",
        Interval::Weekly => "week",
        Interval::Monthly => "month",
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function())
    }
}

impl FromStr for Endpoint {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Endpoint::ALL
            .iter()
            .copied()
            .find(|e| e.function().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParamError::UnknownEndpoint(s.to_string()))
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.function())
    }
}

const NOTICE_KEYS: &[&str] = &["Error Message", "Note", "Information"];

/// Alpha Vantage reports bad symbols, throttling and key problems with HTTP 200
/// and a single message field instead of data. Returns that message.
pub fn api_notice(raw: &Value) -> Option<String> {
    let obj = raw.as_object()?;
    NOTICE_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuEntry {
    pub function: Endpoint,
    pub subtitle: &'static str,
    pub params: Vec<MenuParam>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuParam {
    pub name: &'static str,
    pub label: &'static str,
    pub default: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuCategory {
    pub category: Category,
    pub endpoints: Vec<MenuEntry>,
}

/// The sidebar: categories, their endpoints, and each endpoint's controls.
pub fn menu() -> Vec<MenuCategory> {
    Category::ALL
        .iter()
        .map(|&category| MenuCategory {
            category,
            endpoints: category.endpoints().map(menu_entry).collect(),
        })
        .collect()
}

fn menu_entry(endpoint: Endpoint) -> MenuEntry {
    let def = endpoint.def();
    let defaults = QueryParams::defaults_for(endpoint);
    let params = def
        .params
        .iter()
        .map(|&p| MenuParam {
            name: p.name(),
            label: p.label(),
            default: defaults.get(p),
            choices: param_choices(endpoint, p),
        })
        .collect();
    MenuEntry {
        function: endpoint,
        subtitle: def.subtitle,
        params,
    }
}

pub fn param_choices(endpoint: Endpoint, param: Param) -> Vec<&'static str> {
    match param {
        Param::OutputSize => OutputSize::ALL.iter().map(|o| o.as_str()).collect(),
        Param::Interval => Interval::ALL.iter().map(|i| i.as_str()).collect(),
        Param::SeriesType => endpoint
            .def()
            .series_types
            .iter()
            .map(|s| s.as_str())
            .collect(),
        _ => Vec::new(),
    }
}
