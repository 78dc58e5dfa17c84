//! objects/encode.rs
//!
//! Publisher-side encoding, paired with `decode.rs`.
//!
//! Design notes:
//! - `ObjectWriter` emits any class field by field; it is how tests and tools
//!   produce foreign, extended or deliberately broken objects.
//! - `HistogramDraft` is the mutable publisher model. Only the decoder builds
//!   `HistogramObject`s.

use crate::constants::{histogram_fields as hf, FORMAT_V1, MAGIC_HOBJ};
use crate::histogram::{Axis, StoredStats};
use crate::objects::decode::header_crc;
use crate::objects::registry;
use crate::objects::types::{HeaderFlags, ObjectError, ObjectHeader, WireType};

/// Field-by-field builder for one encoded object.
#[derive(Debug, Clone)]
pub struct ObjectWriter {
    class_name: String,
    class_version: u16,
    format_version: u16,
    flags: HeaderFlags,
    extension: Vec<u8>,
    body: Vec<u8>,
}

impl ObjectWriter {
    pub fn new(class_name: &str, class_version: u16) -> Self {
        Self {
            class_name: class_name.to_string(),
            class_version,
            format_version: FORMAT_V1,
            flags: HeaderFlags::HAS_HEADER_CRC,
            extension: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn format_version(mut self, version: u16) -> Self {
        self.format_version = version;
        self
    }

    pub fn without_header_crc(mut self) -> Self {
        self.flags.remove(HeaderFlags::HAS_HEADER_CRC);
        self
    }

    /// Opaque header bytes a newer writer might add; readers skip them.
    pub fn header_extension(mut self, bytes: &[u8]) -> Self {
        self.extension = bytes.to_vec();
        self
    }

    /// Append a field with an arbitrary wire type byte.
    pub fn put_raw(&mut self, id: u16, wire_type: u8, payload: &[u8]) -> &mut Self {
        self.body.extend_from_slice(&id.to_le_bytes());
        self.body.push(wire_type);
        self.body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.body.extend_from_slice(payload);
        self
    }

    pub fn put_u32(&mut self, id: u16, v: u32) -> &mut Self {
        self.put_raw(id, WireType::U32 as u8, &v.to_le_bytes())
    }

    pub fn put_u64(&mut self, id: u16, v: u64) -> &mut Self {
        self.put_raw(id, WireType::U64 as u8, &v.to_le_bytes())
    }

    pub fn put_f64(&mut self, id: u16, v: f64) -> &mut Self {
        self.put_raw(id, WireType::F64 as u8, &v.to_le_bytes())
    }

    pub fn put_str(&mut self, id: u16, v: &str) -> &mut Self {
        self.put_raw(id, WireType::Str as u8, v.as_bytes())
    }

    pub fn put_bytes(&mut self, id: u16, v: &[u8]) -> &mut Self {
        self.put_raw(id, WireType::Bytes as u8, v)
    }

    pub fn put_f64_array(&mut self, id: u16, values: &[f64]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.put_raw(id, WireType::F64Array as u8, &payload)
    }

    pub fn put_f32_array(&mut self, id: u16, values: &[f64]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| (*v as f32).to_le_bytes()).collect();
        self.put_raw(id, WireType::F32Array as u8, &payload)
    }

    pub fn put_i32_array(&mut self, id: u16, values: &[f64]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| (v.round() as i32).to_le_bytes()).collect();
        self.put_raw(id, WireType::I32Array as u8, &payload)
    }

    /// Numeric array in the requested element encoding.
    pub fn put_array(&mut self, id: u16, wire_type: WireType, values: &[f64]) -> &mut Self {
        match wire_type {
            WireType::F32Array => self.put_f32_array(id, values),
            WireType::I32Array => self.put_i32_array(id, values),
            _ => self.put_f64_array(id, values),
        }
    }

    /// Encode header + body into one frame.
    ///
    /// Layout:
    ///
    /// ```text
    /// [ magic (4) ][ format_version (2) ][ header_len (2) ][ class_version (2) ]
    /// [ flags (2) ][ body_len (4) ][ header_crc32 (4) ][ name_len (1) ][ name ]
    /// [ extension ][ fields ]
    /// ```
    pub fn finish(&self) -> Result<Vec<u8>, ObjectError> {
        let name = self.class_name.as_bytes();
        let name_len = u8::try_from(name.len()).map_err(|_| ObjectError::ClassNameTooLong(name.len()))?;
        let header_len = u16::try_from(ObjectHeader::FIXED_LEN + name.len() + self.extension.len())
            .map_err(|_| ObjectError::TooLarge("header"))?;
        let body_len = u32::try_from(self.body.len()).map_err(|_| ObjectError::TooLarge("body"))?;

        let mut out = Vec::with_capacity(header_len as usize + self.body.len());

        // --- Header ---
        out.extend_from_slice(&MAGIC_HOBJ);
        out.extend_from_slice(&self.format_version.to_le_bytes());
        out.extend_from_slice(&header_len.to_le_bytes());
        out.extend_from_slice(&self.class_version.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&body_len.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // crc placeholder
        out.push(name_len);
        out.extend_from_slice(name);
        out.extend_from_slice(&self.extension);

        if self.flags.contains(HeaderFlags::HAS_HEADER_CRC) {
            let crc = header_crc(&out);
            let at = ObjectHeader::CRC_OFFSET;
            out[at..at + 4].copy_from_slice(&crc.to_le_bytes());
        }

        // --- Body ---
        out.extend_from_slice(&self.body);

        Ok(out)
    }
}

/// Binning of a draft histogram.
#[derive(Debug, Clone, PartialEq)]
pub enum Binning {
    Uniform { nbins: u32, min: f64, max: f64 },
    Edges(Vec<f64>),
}

impl Binning {
    pub fn nbins(&self) -> usize {
        match self {
            Binning::Uniform { nbins, .. } => *nbins as usize,
            Binning::Edges(e) => e.len().saturating_sub(1),
        }
    }

    fn axis(&self) -> Result<Axis, ObjectError> {
        match self {
            Binning::Uniform { nbins, min, max } => Axis::uniform(*nbins as usize, *min, *max),
            Binning::Edges(e) => Axis::variable(e.clone()),
        }
    }
}

/// Publisher-side histogram: fill it, then encode it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramDraft {
    pub class_name: String,
    pub class_version: u16,
    pub name: String,
    pub title: String,
    pub binning: Binning,
    /// nbins + 2 values, underflow first.
    pub contents: Vec<f64>,
    pub entries: Option<f64>,
    pub stats: Option<StoredStats>,
    pub sumw2: Option<Vec<f64>>,
}

impl HistogramDraft {
    pub const DEFAULT_CLASS_VERSION: u16 = 3;

    pub fn uniform(class_name: &str, name: &str, nbins: u32, min: f64, max: f64) -> Self {
        Self::with_binning(class_name, name, Binning::Uniform { nbins, min, max })
    }

    pub fn with_edges(class_name: &str, name: &str, edges: Vec<f64>) -> Self {
        Self::with_binning(class_name, name, Binning::Edges(edges))
    }

    /// Bins centered on `centers` (midpoints become edges), filled with `counts`.
    pub fn from_centers(class_name: &str, name: &str, centers: &[f64], counts: &[f64]) -> Self {
        let edges = edges_around(centers);
        let mut draft = Self::with_edges(class_name, name, edges);
        for (bin, count) in counts.iter().enumerate().take(centers.len()) {
            draft.contents[bin + 1] = *count;
        }
        draft
    }

    fn with_binning(class_name: &str, name: &str, binning: Binning) -> Self {
        let contents = vec![0.0; binning.nbins() + 2];
        Self {
            class_name: class_name.to_string(),
            class_version: Self::DEFAULT_CLASS_VERSION,
            name: name.to_string(),
            title: String::new(),
            binning,
            contents,
            entries: None,
            stats: None,
            sumw2: None,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Add `w` at `x`, keeping entries, stored stats and sumw2 in step.
    pub fn fill(&mut self, x: f64, w: f64) -> Result<usize, ObjectError> {
        let axis = self.binning.axis()?;
        let bin = axis.find_bin(x);
        if let Some(c) = self.contents.get_mut(bin) {
            *c += w;
        }

        let sumw2 = self.sumw2.get_or_insert_with(|| vec![0.0; axis.nbins() + 2]);
        if let Some(s) = sumw2.get_mut(bin) {
            *s += w * w;
        }

        *self.entries.get_or_insert(0.0) += 1.0;

        if bin >= 1 && bin <= axis.nbins() {
            let s = self.stats.get_or_insert(StoredStats { sumw: 0.0, sumw2: 0.0, sumwx: 0.0, sumwx2: 0.0 });
            s.sumw += w;
            s.sumw2 += w * w;
            s.sumwx += w * x;
            s.sumwx2 += w * x * x;
        }
        Ok(bin)
    }
}

fn edges_around(centers: &[f64]) -> Vec<f64> {
    match centers {
        [] => Vec::new(),
        [c] => vec![c - 0.5, c + 0.5],
        _ => {
            let first = centers[0] - 0.5 * (centers[1] - centers[0]);
            let n = centers.len();
            let last = centers[n - 1] + 0.5 * (centers[n - 1] - centers[n - 2]);
            std::iter::once(first)
                .chain(centers.windows(2).map(|w| 0.5 * (w[0] + w[1])))
                .chain(std::iter::once(last))
                .collect()
        }
    }
}

/// Encode a draft histogram in the format its class uses.
pub fn encode_histogram(draft: &HistogramDraft) -> Result<Vec<u8>, ObjectError> {
    let nbins = draft.binning.nbins();
    if nbins == 0 {
        return Err(ObjectError::InvalidAxis("zero bins".into()));
    }
    if draft.contents.len() != nbins + 2 {
        return Err(ObjectError::LengthMismatch {
            field: "contents",
            expected: nbins + 2,
            actual: draft.contents.len(),
        });
    }
    let nbins = u32::try_from(nbins).map_err(|_| ObjectError::TooLarge("nbins"))?;

    let mut w = ObjectWriter::new(&draft.class_name, draft.class_version);
    w.put_str(hf::NAME, &draft.name)
        .put_str(hf::TITLE, &draft.title)
        .put_u32(hf::NBINS, nbins);

    match &draft.binning {
        Binning::Uniform { min, max, .. } => {
            w.put_f64(hf::X_MIN, *min).put_f64(hf::X_MAX, *max);
        }
        Binning::Edges(edges) => {
            w.put_f64_array(hf::X_EDGES, edges);
        }
    }

    w.put_array(hf::CONTENTS, registry::contents_wire_type(&draft.class_name), &draft.contents);

    if let Some(entries) = draft.entries {
        w.put_f64(hf::ENTRIES, entries);
    }
    if let Some(stats) = draft.stats {
        w.put_f64_array(hf::STATS, &stats.to_array());
    }
    if let Some(sumw2) = &draft.sumw2 {
        w.put_f64_array(hf::SUMW2, sumw2);
    }

    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_around_centers() {
        assert_eq!(edges_around(&[1.0, 2.0, 3.0]), vec![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(edges_around(&[4.0]), vec![3.5, 4.5]);
    }

    #[test]
    fn fill_tracks_stats_for_in_range_only() {
        let mut d = HistogramDraft::uniform("TH1D", "h", 2, 0.0, 2.0);
        d.fill(0.5, 1.0).unwrap();
        d.fill(5.0, 1.0).unwrap();
        assert_eq!(d.contents, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(d.entries, Some(2.0));
        assert_eq!(d.stats.map(|s| s.sumw), Some(1.0));
    }

    #[test]
    fn long_class_names_are_refused() {
        let name = "X".repeat(300);
        assert!(matches!(
            ObjectWriter::new(&name, 1).finish(),
            Err(ObjectError::ClassNameTooLong(300))
        ));
    }
}
