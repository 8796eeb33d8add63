pub mod log;
pub mod correction;
pub mod analyzer;
pub mod health;
pub mod capture;
pub mod file_tools;
pub mod image_tools;
pub mod glyphs;
pub mod chart;
