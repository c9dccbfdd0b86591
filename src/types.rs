//! Core data types: clusters, covariates, designs and results.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Site-by-site correlation matrix.
pub type Sigma = DMatrix<f64>;

/// A `sites × samples` table of measurements.
///
/// Missing entries are stored as NaN. [`Cluster::get`] reports them as
/// `None`; [`Cluster::site`] hands them out as NaN for the fitters.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    values: DMatrix<f64>,
}

impl Cluster {
    /// Build a cluster from one row per site. `None` marks a missing sample.
    pub fn from_sites(rows: &[Vec<Option<f64>>]) -> Result<Self> {
        let n_sites = rows.len();
        let n_samples = rows.first().map_or(0, Vec::len);
        if n_sites == 0 || n_samples == 0 {
            return Err(Error::EmptyCluster);
        }
        for row in rows {
            if row.len() != n_samples {
                return Err(Error::LengthMismatch {
                    what: "site samples",
                    expected: n_samples,
                    actual: row.len(),
                });
            }
        }
        let values = DMatrix::from_fn(n_sites, n_samples, |i, j| {
            rows[i][j].filter(|v| v.is_finite()).unwrap_or(f64::NAN)
        });
        Ok(Self { values })
    }

    /// Build a cluster with no missing data from one row per site.
    pub fn from_complete_sites(rows: &[Vec<f64>]) -> Result<Self> {
        let rows: Vec<Vec<Option<f64>>> = rows
            .iter()
            .map(|row| row.iter().copied().map(Some).collect())
            .collect();
        Self::from_sites(&rows)
    }

    /// Number of sites (rows).
    pub fn n_sites(&self) -> usize {
        self.values.nrows()
    }

    /// Number of samples (columns).
    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// Value at `(site, sample)`, or `None` if missing.
    pub fn get(&self, site: usize, sample: usize) -> Option<f64> {
        let v = self.values[(site, sample)];
        v.is_finite().then_some(v)
    }

    /// Raw row for one site; missing samples are NaN.
    pub fn site(&self, site: usize) -> Vec<f64> {
        self.values.row(site).iter().copied().collect()
    }

    /// Whether any sample is missing at any site.
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Whether every sample of `site` is observed.
    pub fn site_is_complete(&self, site: usize) -> bool {
        self.values.row(site).iter().all(|v| v.is_finite())
    }
}

/// Named predictor columns, one value per sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CovariateTable {
    n_samples: usize,
    columns: Vec<(String, Vec<f64>)>,
}

impl CovariateTable {
    /// Empty table for `n_samples` samples.
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            columns: Vec::new(),
        }
    }

    /// Add a named column.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.push_column(name, values)?;
        Ok(self)
    }

    /// Add a named column, replacing any column with the same name.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        if values.len() != self.n_samples {
            return Err(Error::LengthMismatch {
                what: "covariate column",
                expected: self.n_samples,
                actual: values.len(),
            });
        }
        let name = name.into();
        self.columns.retain(|(existing, _)| *existing != name);
        self.columns.push((name, values));
        Ok(())
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Column names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}

/// Terms of a linear model: an optional intercept plus named covariates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    /// Whether to include an intercept column.
    pub intercept: bool,
    /// Covariate names, in column order.
    pub terms: Vec<String>,
}

impl Design {
    /// Design with an intercept and the given terms.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            intercept: true,
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Intercept-only design.
    pub fn intercept_only() -> Self {
        Self {
            intercept: true,
            terms: Vec::new(),
        }
    }

    /// Number of model-matrix columns.
    pub fn n_columns(&self) -> usize {
        self.terms.len() + usize::from(self.intercept)
    }

    /// Model-matrix column index of `term`.
    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.terms
            .iter()
            .position(|t| t == term)
            .map(|i| i + usize::from(self.intercept))
    }

    /// Build the `samples × columns` model matrix.
    pub fn model_matrix(&self, covariates: &CovariateTable) -> Result<DMatrix<f64>> {
        let n = covariates.n_samples();
        let mut columns: Vec<DVector<f64>> = Vec::with_capacity(self.n_columns());
        if self.intercept {
            columns.push(DVector::from_element(n, 1.0));
        }
        for term in &self.terms {
            let values = covariates
                .column(term)
                .ok_or_else(|| Error::UnknownCovariate(term.clone()))?;
            columns.push(DVector::from_column_slice(values));
        }
        if columns.is_empty() {
            return Err(Error::MalformedNesting("design has no columns".into()));
        }
        Ok(DMatrix::from_columns(&columns))
    }

    /// Name of the single term in `self` that `reduced` lacks.
    ///
    /// Errors unless `reduced` is a strict subset of `self` differing by
    /// exactly one term, with the same intercept setting.
    pub fn coefficient_of_interest(&self, reduced: &Design) -> Result<String> {
        if self.intercept != reduced.intercept {
            return Err(Error::MalformedNesting(
                "full and reduced designs disagree on the intercept".into(),
            ));
        }
        if let Some(extra) = reduced.terms.iter().find(|t| !self.terms.contains(t)) {
            return Err(Error::MalformedNesting(format!(
                "reduced term `{extra}` is not in the full design"
            )));
        }
        let missing: Vec<&String> = self
            .terms
            .iter()
            .filter(|t| !reduced.terms.contains(t))
            .collect();
        match missing.as_slice() {
            [one] => Ok((*one).clone()),
            [] => Err(Error::MalformedNesting(
                "full and reduced designs have the same terms".into(),
            )),
            many => Err(Error::MalformedNesting(format!(
                "full design adds {} terms; expected exactly one",
                many.len()
            ))),
        }
    }
}

/// Per-site fit of a single coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteFit {
    /// Estimated coefficient.
    pub coefficient: f64,
    /// Two-sided p-value for the coefficient.
    pub p_value: f64,
    /// Precision weight, typically 1 / residual standard error.
    pub precision: f64,
}

/// The unit of output for every code path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    /// Name of the coefficient of interest.
    pub covariate: String,
    /// Combined or permutation p-value in `(0, 1]`.
    pub p: f64,
    /// Effect size: mean per-site coefficient.
    pub coefficient: f64,
}
