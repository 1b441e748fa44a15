pub mod client;
pub mod rider_api;

pub use client::{HttpClient, HttpClientBuilder};
pub use rider_api::RiderApiClient;
