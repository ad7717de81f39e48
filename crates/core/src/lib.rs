pub mod detection;
pub mod display;
pub mod imaging;
pub mod pipeline;
pub mod shared;
pub mod video;
