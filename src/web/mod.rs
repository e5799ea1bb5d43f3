//! HTTP surface: admin auth, API handlers and the widget script.

pub mod auth;
pub mod server;
pub mod types;
pub mod widget;

pub use self::auth::AdminAuth;
pub use self::server::{GatewayState, RunningServer, build_router, start_server};
