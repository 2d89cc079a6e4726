pub mod cluster;
pub mod colormap;
pub mod columns;
pub mod config;
pub mod data;
pub mod error;
pub mod explorer;
pub mod flow;
pub mod heatmap;
pub mod models;
pub mod plots;
pub mod quiz;
pub mod ui;
pub mod violin;
