//! mcping Core - Error type, status model and data URLs

mod error;
pub mod data_url;
pub mod status;

pub use data_url::DataUrl;
pub use error::*;
pub use status::{Description, PlayerSample, Players, Status, Version};
