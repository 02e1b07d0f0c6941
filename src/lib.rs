// Library exports for painel

pub mod builders;
pub mod chart;
pub mod data;
pub mod filters;
pub mod loader;
pub mod palette;
pub mod server;
pub mod stats;
