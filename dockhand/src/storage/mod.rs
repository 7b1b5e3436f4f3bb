//! On-disk locations and settings

pub mod layout;
pub mod settings;
