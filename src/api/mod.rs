pub mod api_types;
pub mod cache;
pub mod client;
pub mod transport;
pub mod types;

pub use cache::DashboardQueryKey;
pub use client::ApiClient;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
