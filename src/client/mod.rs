//! Platform client: transport, dialect table, pagination and the
//! composite operation surface.

mod composite;
mod pagination;
mod platform;
mod transport;

pub use composite::{JobFilters, PlatformClient, SystemInfoSection};
pub use pagination::{paginate, PageStream};
pub use platform::{profile, PlatformProfile};
pub use transport::{
    with_retry, AuthScheme, LimitedTransport, ReqwestTransport, RetryPolicy, Transport,
};
