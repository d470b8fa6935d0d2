//! Climate-data retrieval boundary.
//!
//! Uploaded files are produced by a climate-data service (ERA5 on the
//! Copernicus CDS). The exchange itself is a single blocking request owned by
//! a [`ClimateDataSource`] implementation; this module only describes what to
//! ask for and where to put the result.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// ERA5 hourly data on pressure levels.
pub const DEFAULT_DATASET: &str = "reanalysis-era5-pressure-levels";
pub const DEFAULT_PRODUCT_TYPE: &str = "reanalysis";
pub const DEFAULT_VARIABLE: &str = "temperature";
pub const DEFAULT_PRESSURE_LEVEL: &str = "1000";
pub const DEFAULT_FORMAT: &str = "grib";

/// Directory retrieved files are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Base name used when no output name is given.
const DEFAULT_OUTPUT_NAME: &str = "download";

/// Errors from building or running a retrieval.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A required date selection was not supplied.
    #[error("no {0} selected; years, months and days are all required")]
    MissingSelection(&'static str),

    #[error("invalid {field} '{value}'")]
    InvalidSelection { field: &'static str, value: String },

    /// The data service rejected or failed the request.
    #[error("retrieval of {dataset} failed: {reason}")]
    Failed { dataset: String, reason: String },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Parameters of one retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalRequest {
    #[serde(skip)]
    pub dataset: String,
    pub product_type: String,
    pub variable: String,
    #[serde(rename = "pressure_level")]
    pub pressure_levels: Vec<String>,
    #[serde(rename = "year")]
    pub years: Vec<String>,
    #[serde(rename = "month")]
    pub months: Vec<String>,
    #[serde(rename = "day")]
    pub days: Vec<String>,
    #[serde(rename = "time")]
    pub hours: Vec<String>,
    pub format: String,
}

impl RetrievalRequest {
    pub fn builder() -> RetrievalRequestBuilder {
        RetrievalRequestBuilder::default()
    }

    /// Request parameters as the service expects them.
    pub fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Builder for [`RetrievalRequest`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalRequestBuilder {
    dataset: Option<String>,
    product_type: Option<String>,
    variable: Option<String>,
    pressure_levels: Vec<String>,
    years: Vec<String>,
    months: Vec<String>,
    days: Vec<String>,
    hours: Vec<String>,
    format: Option<String>,
}

impl RetrievalRequestBuilder {
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    pub fn variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn pressure_level(mut self, level: impl Into<String>) -> Self {
        self.pressure_levels.push(level.into());
        self
    }

    pub fn years<I, S>(mut self, years: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.years.extend(years.into_iter().map(Into::into));
        self
    }

    pub fn months<I, S>(mut self, months: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.months.extend(months.into_iter().map(Into::into));
        self
    }

    pub fn days<I, S>(mut self, days: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.days.extend(days.into_iter().map(Into::into));
        self
    }

    /// Restrict to specific hours (`HH:MM`); all 24 hours otherwise.
    pub fn hours<I, S>(mut self, hours: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hours.extend(hours.into_iter().map(Into::into));
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Validate the date selection and fill in defaults.
    pub fn build(self) -> Result<RetrievalRequest, RetrievalError> {
        if self.years.is_empty() {
            return Err(RetrievalError::MissingSelection("years"));
        }
        if self.months.is_empty() {
            return Err(RetrievalError::MissingSelection("months"));
        }
        if self.days.is_empty() {
            return Err(RetrievalError::MissingSelection("days"));
        }

        check_numeric("year", &self.years, 1940, 9999)?;
        check_numeric("month", &self.months, 1, 12)?;
        check_numeric("day", &self.days, 1, 31)?;

        let pressure_levels = if self.pressure_levels.is_empty() {
            vec![DEFAULT_PRESSURE_LEVEL.to_string()]
        } else {
            self.pressure_levels
        };
        let hours = if self.hours.is_empty() {
            all_hours()
        } else {
            self.hours
        };

        Ok(RetrievalRequest {
            dataset: self.dataset.unwrap_or_else(|| DEFAULT_DATASET.to_string()),
            product_type: self
                .product_type
                .unwrap_or_else(|| DEFAULT_PRODUCT_TYPE.to_string()),
            variable: self.variable.unwrap_or_else(|| DEFAULT_VARIABLE.to_string()),
            pressure_levels,
            years: self.years,
            months: self.months,
            days: self.days,
            hours,
            format: self.format.unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
        })
    }
}

fn check_numeric(
    field: &'static str,
    values: &[String],
    min: u32,
    max: u32,
) -> Result<(), RetrievalError> {
    for value in values {
        match value.parse::<u32>() {
            Ok(n) if (min..=max).contains(&n) => {}
            _ => {
                return Err(RetrievalError::InvalidSelection {
                    field,
                    value: value.clone(),
                })
            }
        }
    }
    Ok(())
}

/// `00:00` through `23:00`.
pub fn all_hours() -> Vec<String> {
    (0..24).map(|h| format!("{:02}:00", h)).collect()
}

/// Where a retrieval is written: `data/{name}.{format}`, or
/// `data/download.{format}` without a name.
pub fn output_path(name: Option<&str>, format: &str) -> PathBuf {
    let name = name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_OUTPUT_NAME);
    Path::new(DEFAULT_OUTPUT_DIR).join(format!("{}.{}", name, format))
}

/// A service that turns a request into a local file.
///
/// Implementations report service-side problems as [`RetrievalError::Failed`]
/// and local write problems as [`RetrievalError::Io`].
///
/// # Example
///
/// ```
/// use std::path::{Path, PathBuf};
/// use areadata::retrieval::{ClimateDataSource, RetrievalError, RetrievalRequest};
///
/// struct Offline;
///
/// impl ClimateDataSource for Offline {
///     fn retrieve(
///         &self,
///         request: &RetrievalRequest,
///         _target: &Path,
///     ) -> Result<PathBuf, RetrievalError> {
///         Err(RetrievalError::Failed {
///             dataset: request.dataset.clone(),
///             reason: "service unavailable".to_string(),
///         })
///     }
/// }
///
/// let request = RetrievalRequest::builder()
///     .years(["2020"])
///     .months(["01"])
///     .days(["01"])
///     .build()?;
/// let err = Offline
///     .retrieve(&request, Path::new("data/download.grib"))
///     .unwrap_err();
/// assert!(err.to_string().contains("service unavailable"));
/// # Ok::<(), RetrievalError>(())
/// ```
pub trait ClimateDataSource {
    /// Run `request`, writing the product to `target`, and return the path
    /// of the written file.
    fn retrieve(
        &self,
        request: &RetrievalRequest,
        target: &Path,
    ) -> Result<PathBuf, RetrievalError>;
}
