pub mod config;
pub mod dashboard;
pub mod errors;
pub mod links;
pub mod public_url;
pub mod render;

pub use dashboard::{Dashboard, DashboardError, DashboardService, DashboardUid};
pub use errors::{ApplicationError, InterfaceError};
pub use links::{extract_url_info, DashboardLink};
pub use render::{RenderError, RenderOptions, RenderResult, Renderer};
