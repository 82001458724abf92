pub mod buffer;
pub mod device;
pub mod error;
pub mod layout;
pub mod params;
pub mod program;
pub mod sgm;
