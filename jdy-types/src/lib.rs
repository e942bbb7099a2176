//! Schema, conversion and filter types for the JianDaoYun open API.
//!
//! This crate is pure data — no I/O. It defines:
//! - [`FieldType`] / [`FieldDescriptor`] — the form field schema model
//! - [`convert_record`] and friends — translation of caller records into
//!   the platform's per-field `{"value": V}` write envelopes, with the
//!   absent / clear / set tri-state the remote distinguishes
//! - [`Filter`] — the fluent query filter for the data-listing endpoint
//! - the structured value shapes (address, location, attachments, members,
//!   departments, phone) and per-row system metadata
//!
//! The networked client lives in the `jdy-client` crate.

mod convert;
mod field;
mod filter;
mod value;

pub use convert::{
    clear_envelope, convert_record, convert_value, converter_for, drop_clear_envelopes, envelope,
    Conversion, ConversionError, ConversionResult, Convert, Converted, SkippedField,
};
pub use field::{descriptor_map, FieldDescriptor, FieldType};
pub use filter::{Condition, Filter, FilterMethod, Relation};
pub use value::{Address, Attachment, DeptRef, Location, PhoneValue, RecordMeta, UserRef};
