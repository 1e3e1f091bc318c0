pub mod avatar;
pub mod config;
pub mod error_codes;
pub mod export;
pub mod font_assets;
pub mod generate;
pub mod layout;
pub mod model;
pub mod raster;
pub mod render;
pub mod script;
pub mod session;
pub mod style;
pub mod timeline;
pub mod typing;
pub mod watch;
