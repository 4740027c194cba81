pub mod cameras;
pub mod violations;
