//! Typed event headers: the value model, its wire codec and the catalog
//! attached to every generated test event.

pub mod catalog;
pub mod value;

pub use catalog::{attach_typed_headers, typed_header_catalog, CATALOG};
pub use value::{ByteStream, HeaderType, HeaderValue};
