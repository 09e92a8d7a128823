//! Small helpers shared by the upstream adapters.

pub mod data_url;

pub use data_url::{to_data_url, DataUrl};
