pub mod hub;
pub mod payload;
#[cfg(test)]
mod tests;

pub use hub::{create_alert_hub, AlertHub};
pub use payload::AlertPayload;
