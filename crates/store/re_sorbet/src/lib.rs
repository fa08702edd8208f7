//! Rerun arrow metadata conventions for tabular data.
//!
//! An arrow record batch sent to Rerun describes each of its columns through field-level
//! metadata (`rerun.kind`, `rerun.entity_path`, `rerun.component`, …).
//! This crate decodes those conventions into [`ColumnDescriptor`]s.

mod column_descriptor;
mod column_kind;
mod component_column_descriptor;
mod index_column_descriptor;
mod metadata;

pub use self::{
    column_descriptor::{ColumnDescriptor, ColumnError},
    column_kind::{ColumnKind, UnknownColumnKind},
    component_column_descriptor::{ComponentColumnDescriptor, UNKNOWN_COMPONENT_TYPE},
    index_column_descriptor::IndexColumnDescriptor,
    metadata::{ArrowFieldMetadata, MetadataExt, keys},
};
