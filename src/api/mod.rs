pub mod alerts_ws;
pub mod rest;

pub use rest::RestApi;
