pub mod cameras;
pub mod statistics;
pub mod violations;

pub use cameras::CameraService;
pub use statistics::StatisticsService;
pub use violations::ViolationService;
