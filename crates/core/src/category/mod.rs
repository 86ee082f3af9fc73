//! Universal category taxonomy and per-source category mapping.
//!
//! Every source speaks its own category dialect. The [`CategoryMapper`]
//! translates between that dialect and the universal ids in [`taxonomy`].

mod mapper;
pub mod taxonomy;

pub use mapper::{CategoryMapper, CategoryMapping};
pub use taxonomy::{Category, CUSTOM_CATEGORY_OFFSET};
