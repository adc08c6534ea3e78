use crate::endpoint::Endpoint;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("unknown endpoint `{0}`")]
    UnknownEndpoint(String),

    #[error("unknown parameter `{0}`")]
    UnknownParam(String),

    #[error("parameter `{param}` does not apply to {endpoint}")]
    NotApplicable {
        param: &'static str,
        endpoint: Endpoint,
    },

    #[error("invalid value `{value}` for {param}; expected {expected}")]
    InvalidValue {
        param: &'static str,
        value: String,
        expected: String,
    },
}

macro_rules! choice_enum {
    ($name:ident, $param:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParamError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParamError::InvalidValue {
                        param: $param,
                        value: s.to_string(),
                        expected: [$($text),+].join("|"),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum!(OutputSize, "outputsize", { Compact => "compact", Full => "full" });
choice_enum!(Interval, "interval", { Daily => "daily", Weekly => "weekly", Monthly => "monthly" });
choice_enum!(SeriesType, "series_type", {
    Close => "close",
    Open => "open",
    High => "high",
    Low => "low",
});

/// One sidebar control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Symbol,
    OutputSize,
    Keywords,
    FromCurrency,
    ToCurrency,
    Interval,
    TimePeriod,
    SeriesType,
}

impl Param {
    pub const ALL: &'static [Param] = &[
        Param::Symbol,
        Param::OutputSize,
        Param::Keywords,
        Param::FromCurrency,
        Param::ToCurrency,
        Param::Interval,
        Param::TimePeriod,
        Param::SeriesType,
    ];

    /// Name used on the command line and in HTTP query strings.
    pub fn name(self) -> &'static str {
        match self {
            Param::Symbol => "symbol",
            Param::OutputSize => "outputsize",
            Param::Keywords => "keywords",
            Param::FromCurrency => "from",
            Param::ToCurrency => "to",
            Param::Interval => "interval",
            Param::TimePeriod => "time_period",
            Param::SeriesType => "series_type",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Param::Symbol => "Stock Symbol",
            Param::OutputSize => "Data Amount",
            Param::Keywords => "Search Keywords",
            Param::FromCurrency => "From Currency",
            Param::ToCurrency => "To Currency",
            Param::Interval => "Interval",
            Param::TimePeriod => "Time Period",
            Param::SeriesType => "Series Type",
        }
    }

    pub fn from_name(name: &str) -> Result<Param, ParamError> {
        Param::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ParamError::UnknownParam(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParams {
    pub symbol: String,
    pub output_size: OutputSize,
    pub keywords: String,
    pub from_currency: String,
    pub to_currency: String,
    pub interval: Interval,
    pub time_period: u32,
    pub series_type: SeriesType,
}

impl QueryParams {
    /// Sidebar defaults for `endpoint`.
    pub fn defaults_for(endpoint: Endpoint) -> Self {
        let def = endpoint.def();
        Self {
            symbol: def.default_symbol.to_string(),
            output_size: OutputSize::Compact,
            keywords: "tesco".to_string(),
            from_currency: "EUR".to_string(),
            to_currency: "USD".to_string(),
            interval: Interval::Daily,
            time_period: def.default_time_period,
            series_type: SeriesType::Close,
        }
    }

    /// Current value of `param` as shown in a prompt.
    pub fn get(&self, param: Param) -> String {
        match param {
            Param::Symbol => self.symbol.clone(),
            Param::OutputSize => self.output_size.to_string(),
            Param::Keywords => self.keywords.clone(),
            Param::FromCurrency => self.from_currency.clone(),
            Param::ToCurrency => self.to_currency.clone(),
            Param::Interval => self.interval.to_string(),
            Param::TimePeriod => self.time_period.to_string(),
            Param::SeriesType => self.series_type.to_string(),
        }
    }
}

/// An endpoint plus its parameter values; what one user action asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub endpoint: Endpoint,
    pub params: QueryParams,
}

impl Selection {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: QueryParams::defaults_for(endpoint),
        }
    }

    /// Applies one control value with the same constraints the sidebar enforces.
    pub fn set(&mut self, param: Param, value: &str) -> Result<(), ParamError> {
        let def = self.endpoint.def();
        if !def.params.contains(&param) {
            return Err(ParamError::NotApplicable {
                param: param.name(),
                endpoint: self.endpoint,
            });
        }

        let value = value.trim();
        let p = &mut self.params;
        match param {
            Param::Symbol => p.symbol = non_empty(param, value)?.to_ascii_uppercase(),
            Param::Keywords => p.keywords = non_empty(param, value)?.to_string(),
            Param::FromCurrency => p.from_currency = currency(param, value)?,
            Param::ToCurrency => p.to_currency = currency(param, value)?,
            Param::OutputSize => p.output_size = value.parse()?,
            Param::Interval => p.interval = value.parse()?,
            Param::TimePeriod => {
                p.time_period = value
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| ParamError::InvalidValue {
                        param: param.name(),
                        value: value.to_string(),
                        expected: "an integer >= 1".to_string(),
                    })?
            }
            Param::SeriesType => {
                let series: SeriesType = value.parse()?;
                if !def.series_types.contains(&series) {
                    return Err(ParamError::InvalidValue {
                        param: param.name(),
                        value: value.to_string(),
                        expected: def
                            .series_types
                            .iter()
                            .map(|s| s.as_str())
                            .collect::<Vec<_>>()
                            .join("|"),
                    });
                }
                p.series_type = series;
            }
        }
        Ok(())
    }

    pub fn set_named(&mut self, name: &str, value: &str) -> Result<(), ParamError> {
        let param = Param::from_name(name)?;
        self.set(param, value)
    }
}

fn non_empty(param: Param, value: &str) -> Result<&str, ParamError> {
    if value.is_empty() {
        return Err(ParamError::InvalidValue {
            param: param.name(),
            value: value.to_string(),
            expected: "a non-empty value".to_string(),
        });
    }
    Ok(value)
}

fn currency(param: Param, value: &str) -> Result<String, ParamError> {
    let code = value.to_ascii_uppercase();
    if !(2..=10).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ParamError::InvalidValue {
            param: param.name(),
            value: value.to_string(),
            expected: "a currency code such as USD".to_string(),
        });
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_sidebar() {
        let sma = Selection::new(Endpoint::Sma);
        assert_eq!(sma.params.symbol, "TSLA");
        assert_eq!(sma.params.time_period, 20);
        assert_eq!(sma.params.interval, Interval::Daily);

        let rsi = Selection::new(Endpoint::Rsi);
        assert_eq!(rsi.params.symbol, "GOOGL");
        assert_eq!(rsi.params.time_period, 14);

        assert_eq!(Selection::new(Endpoint::TimeSeriesDaily).params.symbol, "IBM");
    }

    #[test]
    fn symbol_is_upper_cased() {
        let mut s = Selection::new(Endpoint::GlobalQuote);
        s.set(Param::Symbol, " msft ").unwrap();
        assert_eq!(s.params.symbol, "MSFT");
    }

    #[test]
    fn time_period_must_be_positive() {
        let mut s = Selection::new(Endpoint::Sma);
        assert!(s.set(Param::TimePeriod, "0").is_err());
        assert!(s.set(Param::TimePeriod, "-3").is_err());
        assert!(s.set(Param::TimePeriod, "ten").is_err());
        s.set(Param::TimePeriod, "50").unwrap();
        assert_eq!(s.params.time_period, 50);
    }

    #[test]
    fn rsi_only_offers_close() {
        let mut rsi = Selection::new(Endpoint::Rsi);
        assert!(rsi.set(Param::SeriesType, "open").is_err());
        rsi.set(Param::SeriesType, "close").unwrap();

        let mut sma = Selection::new(Endpoint::Sma);
        sma.set(Param::SeriesType, "HIGH").unwrap();
        assert_eq!(sma.params.series_type, SeriesType::High);
    }

    #[test]
    fn rejects_params_the_endpoint_does_not_take() {
        let mut s = Selection::new(Endpoint::GlobalQuote);
        let err = s.set(Param::Interval, "weekly").unwrap_err();
        assert_eq!(
            err,
            ParamError::NotApplicable {
                param: "interval",
                endpoint: Endpoint::GlobalQuote
            }
        );
        assert!(matches!(
            s.set_named("colour", "red"),
            Err(ParamError::UnknownParam(_))
        ));
    }

    #[test]
    fn parses_choice_values() {
        assert_eq!("Weekly".parse::<Interval>().unwrap(), Interval::Weekly);
        assert_eq!("full".parse::<OutputSize>().unwrap(), OutputSize::Full);
        let err = "hourly".parse::<Interval>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value `hourly` for interval; expected daily|weekly|monthly"
        );
    }

    #[test]
    fn currencies_are_validated() {
        let mut s = Selection::new(Endpoint::CurrencyExchangeRate);
        s.set_named("from", "btc").unwrap();
        assert_eq!(s.params.from_currency, "BTC");
        assert!(s.set_named("to", "US DOLLAR").is_err());
    }
}
