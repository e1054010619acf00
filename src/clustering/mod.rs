// Density-based clustering of keyword feature vectors.

pub mod dbscan;

pub use dbscan::{DbscanParams, DensityClusterer, NOISE_LABEL};
