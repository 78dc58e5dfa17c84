//! objects/registry.rs
//! Class registry: class name -> family and contents encoding.
//!
//! The decoder never dispatches on arbitrary runtime types. The registry only
//! answers "which family is this class in" and "can we materialize it".

use crate::objects::types::{TypeTag, WireType};

/// Family of the 1-D histogram classes, the only one materialized here.
pub const HISTOGRAM_1D_FAMILY: &str = "TH1";

pub struct ClassInfo {
    pub name: &'static str,
    pub family: &'static str,
    /// Array encoding used for bin contents, if the class is a histogram.
    pub contents: Option<WireType>,
}

const CLASSES: &[ClassInfo] = &[
    ClassInfo { name: "TH1F", family: HISTOGRAM_1D_FAMILY, contents: Some(WireType::F32Array) },
    ClassInfo { name: "TH1D", family: HISTOGRAM_1D_FAMILY, contents: Some(WireType::F64Array) },
    ClassInfo { name: "TH1I", family: HISTOGRAM_1D_FAMILY, contents: Some(WireType::I32Array) },
    ClassInfo { name: "TH1S", family: HISTOGRAM_1D_FAMILY, contents: Some(WireType::I32Array) },
    ClassInfo { name: "TH1C", family: HISTOGRAM_1D_FAMILY, contents: Some(WireType::I32Array) },
    ClassInfo { name: "TH2F", family: "TH2", contents: Some(WireType::F32Array) },
    ClassInfo { name: "TH2D", family: "TH2", contents: Some(WireType::F64Array) },
    ClassInfo { name: "TProfile", family: "TProfile", contents: Some(WireType::F64Array) },
    ClassInfo { name: "TGraph", family: "TGraph", contents: None },
];

pub fn lookup(class_name: &str) -> Option<&'static ClassInfo> {
    CLASSES.iter().find(|c| c.name == class_name)
}

/// Resolve a class name. Unregistered classes are their own family.
pub fn resolve(class_name: &str) -> TypeTag {
    match lookup(class_name) {
        Some(info) => TypeTag { name: info.name.to_string(), family: info.family.to_string() },
        None => TypeTag { name: class_name.to_string(), family: class_name.to_string() },
    }
}

/// Whether this crate can build an object for the family.
pub fn is_materializable(family: &str) -> bool {
    family == HISTOGRAM_1D_FAMILY
}

/// Contents encoding for a histogram class; unknown classes use `F64Array`.
pub fn contents_wire_type(class_name: &str) -> WireType {
    lookup(class_name)
        .and_then(|c| c.contents)
        .unwrap_or(WireType::F64Array)
}

impl TypeTag {
    /// Parse a configured type name. Empty or blank names are rejected.
    pub fn from_name(name: &str) -> Option<TypeTag> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(resolve(trimmed))
    }

    pub fn same_family(&self, other: &TypeTag) -> bool {
        self.family == other.family
    }
}
