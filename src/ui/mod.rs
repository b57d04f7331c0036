pub mod dashboard;
pub mod icons;

pub use dashboard::{Dashboard, UiMode};
