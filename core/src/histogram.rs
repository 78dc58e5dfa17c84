//! histogram.rs
//! Decoded 1-D histogram and its derived statistics.
//!
//! Design notes:
//! - Bin numbering follows the usual convention: 0 = underflow,
//!   1..=nbins = in-range bins, nbins + 1 = overflow.
//! - Statistics are computed once at construction and never change.
//! - Stored statistics (sum of weights and moments) take precedence over
//!   bin-center statistics when the publisher sent them.

use serde::Serialize;

use crate::objects::ObjectError;

/// Bin edges of one axis (`nbins + 1`, strictly increasing).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    edges: Vec<f64>,
}

impl Axis {
    pub(crate) fn uniform(nbins: usize, min: f64, max: f64) -> Result<Self, ObjectError> {
        if nbins == 0 {
            return Err(ObjectError::InvalidAxis("zero bins".into()));
        }
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(ObjectError::InvalidAxis(format!("bad range [{min}, {max})")));
        }
        let width = (max - min) / nbins as f64;
        let edges = (0..=nbins)
            .map(|i| if i == nbins { max } else { min + width * i as f64 })
            .collect();
        Ok(Self { edges })
    }

    pub(crate) fn variable(edges: Vec<f64>) -> Result<Self, ObjectError> {
        if edges.len() < 2 {
            return Err(ObjectError::InvalidAxis(format!("{} edges", edges.len())));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(ObjectError::InvalidAxis("non-finite edge".into()));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ObjectError::InvalidAxis("edges not strictly increasing".into()));
        }
        Ok(Self { edges })
    }

    pub fn nbins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    pub fn max(&self) -> f64 {
        self.edges[self.nbins()]
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Low edge of in-range bin `bin` (1-based).
    pub fn low_edge(&self, bin: usize) -> Option<f64> {
        if bin == 0 || bin > self.nbins() {
            return None;
        }
        Some(self.edges[bin - 1])
    }

    pub fn width(&self, bin: usize) -> Option<f64> {
        let low = self.low_edge(bin)?;
        Some(self.edges[bin] - low)
    }

    pub fn center(&self, bin: usize) -> Option<f64> {
        let low = self.low_edge(bin)?;
        Some(0.5 * (low + self.edges[bin]))
    }

    /// Bin index for `x`, including underflow (0) and overflow (nbins + 1).
    pub fn find_bin(&self, x: f64) -> usize {
        if x < self.min() {
            return 0;
        }
        if x >= self.max() {
            return self.nbins() + 1;
        }
        // first edge strictly greater than x
        self.edges.partition_point(|e| *e <= x)
    }
}

/// Sums the publisher accumulated while filling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoredStats {
    pub sumw: f64,
    pub sumw2: f64,
    pub sumwx: f64,
    pub sumwx2: f64,
}

impl StoredStats {
    pub const LEN: usize = 4;

    pub fn to_array(self) -> [f64; 4] {
        [self.sumw, self.sumw2, self.sumwx, self.sumwx2]
    }

    pub(crate) fn from_slice(v: &[f64]) -> Result<Self, ObjectError> {
        match v {
            [sumw, sumw2, sumwx, sumwx2] => Ok(Self {
                sumw: *sumw,
                sumw2: *sumw2,
                sumwx: *sumwx,
                sumwx2: *sumwx2,
            }),
            _ => Err(ObjectError::LengthMismatch {
                field: "stats",
                expected: Self::LEN,
                actual: v.len(),
            }),
        }
    }
}

/// Derived scalar statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramStats {
    pub mean: f64,
    pub std_dev: f64,
    pub integral: f64,
    pub underflow: f64,
    pub overflow: f64,
    pub entries: f64,
    pub maximum_bin: usize,
    pub maximum: f64,
}

/// Raw decoded pieces, validated by [`HistogramObject::from_parts`].
#[derive(Debug, Clone, Default)]
pub(crate) struct HistogramParts {
    pub class_name: String,
    pub class_version: u16,
    pub name: String,
    pub title: String,
    pub nbins: Option<u32>,
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub x_edges: Option<Vec<f64>>,
    pub contents: Option<Vec<f64>>,
    pub entries: Option<f64>,
    pub stats: Option<Vec<f64>>,
    pub sumw2: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramObject {
    class_name: String,
    class_version: u16,
    name: String,
    title: String,
    axis: Axis,
    /// nbins + 2 values, underflow first.
    contents: Vec<f64>,
    sumw2: Option<Vec<f64>>,
    stored: Option<StoredStats>,
    stats: HistogramStats,
}

impl HistogramObject {
    pub(crate) fn from_parts(parts: HistogramParts) -> Result<Self, ObjectError> {
        let nbins = match parts.nbins {
            Some(0) => return Err(ObjectError::InvalidAxis("zero bins".into())),
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|n| n.checked_add(2).is_some())
                .ok_or_else(|| ObjectError::InvalidAxis(format!("{n} bins do not fit in memory")))?,
            None => return Err(ObjectError::MissingField("nbins")),
        };

        // Contents are bounded by the frame, so check them before sizing the axis.
        let contents = parts.contents.ok_or(ObjectError::MissingField("contents"))?;
        if contents.len() != nbins + 2 {
            return Err(ObjectError::LengthMismatch {
                field: "contents",
                expected: nbins + 2,
                actual: contents.len(),
            });
        }

        let axis = match parts.x_edges {
            Some(edges) => {
                if edges.len() != nbins + 1 {
                    return Err(ObjectError::LengthMismatch {
                        field: "x_edges",
                        expected: nbins + 1,
                        actual: edges.len(),
                    });
                }
                Axis::variable(edges)?
            }
            None => {
                let min = parts.x_min.ok_or(ObjectError::MissingField("x_min"))?;
                let max = parts.x_max.ok_or(ObjectError::MissingField("x_max"))?;
                Axis::uniform(nbins, min, max)?
            }
        };

        if let Some(sumw2) = &parts.sumw2 {
            if sumw2.len() != nbins + 2 {
                return Err(ObjectError::LengthMismatch {
                    field: "sumw2",
                    expected: nbins + 2,
                    actual: sumw2.len(),
                });
            }
        }

        let stored = parts.stats.as_deref().map(StoredStats::from_slice).transpose()?;
        let entries = parts.entries.unwrap_or_else(|| contents.iter().sum());
        let stats = compute_stats(&axis, &contents, stored, entries);

        Ok(Self {
            class_name: parts.class_name,
            class_version: parts.class_version,
            name: parts.name,
            title: parts.title,
            axis,
            contents,
            sumw2: parts.sumw2,
            stored,
            stats,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn class_version(&self) -> u16 {
        self.class_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn nbins(&self) -> usize {
        self.axis.nbins()
    }

    /// All contents including underflow and overflow.
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    pub fn bin_content(&self, bin: usize) -> Option<f64> {
        self.contents.get(bin).copied()
    }

    pub fn bin_center(&self, bin: usize) -> Option<f64> {
        self.axis.center(bin)
    }

    pub fn bin_low_edge(&self, bin: usize) -> Option<f64> {
        self.axis.low_edge(bin)
    }

    /// sqrt(sumw2) when per-bin weights were sent, sqrt(|content|) otherwise.
    pub fn bin_error(&self, bin: usize) -> Option<f64> {
        match &self.sumw2 {
            Some(w2) => w2.get(bin).map(|v| v.abs().sqrt()),
            None => self.bin_content(bin).map(|c| c.abs().sqrt()),
        }
    }

    /// In-range `(center, content)` pairs.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (1..=self.nbins()).filter_map(move |b| Some((self.axis.center(b)?, self.contents[b])))
    }

    pub fn stored_stats(&self) -> Option<StoredStats> {
        self.stored
    }

    pub fn stats(&self) -> &HistogramStats {
        &self.stats
    }

    pub fn mean(&self) -> f64 {
        self.stats.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.stats.std_dev
    }

    pub fn entries(&self) -> f64 {
        self.stats.entries
    }

    pub fn integral(&self) -> f64 {
        self.stats.integral
    }
}

fn compute_stats(
    axis: &Axis,
    contents: &[f64],
    stored: Option<StoredStats>,
    entries: f64,
) -> HistogramStats {
    let nbins = axis.nbins();

    let mut integral = 0.0;
    let mut sumwx = 0.0;
    let mut sumwx2 = 0.0;
    let mut maximum_bin = 1;
    let mut maximum = f64::NEG_INFINITY;

    for bin in 1..=nbins {
        let w = contents[bin];
        let x = axis.center(bin).unwrap_or(0.0);
        integral += w;
        sumwx += w * x;
        sumwx2 += w * x * x;
        if w > maximum {
            maximum = w;
            maximum_bin = bin;
        }
    }

    let (sumw, sumwx, sumwx2) = match stored {
        Some(s) if s.sumw != 0.0 => (s.sumw, s.sumwx, s.sumwx2),
        _ => (integral, sumwx, sumwx2),
    };

    let (mean, std_dev) = if sumw == 0.0 {
        (0.0, 0.0)
    } else {
        let mean = sumwx / sumw;
        let variance = (sumwx2 / sumw - mean * mean).abs();
        (mean, variance.sqrt())
    };

    HistogramStats {
        mean,
        std_dev,
        integral,
        underflow: contents[0],
        overflow: contents[nbins + 1],
        entries,
        maximum_bin,
        maximum,
    }
}
