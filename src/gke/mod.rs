/// Google Kubernetes Engine API client implementation
pub mod authorized_networks;
pub mod client;
pub mod lister;
pub mod location;
pub mod models;
pub mod operations;

pub use authorized_networks::AuthorizedNetworksPatcher;
pub use client::GkeClient;
pub use lister::ClusterLister;
pub use location::{Location, LocationPath};
pub use operations::OperationWaiter;
