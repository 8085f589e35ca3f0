mod http_transport;
mod prepared;

pub use http_transport::HttpTransport;
pub use prepared::{build_attempt_url, PreparedSource};
