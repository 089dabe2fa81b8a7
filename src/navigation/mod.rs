//! Shareable link state.
//!
//! The list view's [`QueryDescriptor`](crate::domain::QueryDescriptor) is
//! mirrored into a query string (`q`, `cat`, `loc`, `sort`, `view`) so a
//! search can be bookmarked or shared. [`query_string`] holds the codec and
//! [`address_bar`] the host boundary it is written through.

pub mod address_bar;
pub mod query_string;

pub use address_bar::{AddressBar, InMemoryAddressBar};
pub use query_string::{parse_query_string, to_query_string};
