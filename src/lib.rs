// kwcluster: semantic keyword clustering.
//
// This is the library root. Each module corresponds to one stage or
// collaborator of the clustering pipeline.

pub mod clustering;
pub mod config;
pub mod db;
pub mod embedding;
pub mod output;
pub mod pipeline;
pub mod search;
pub mod status;
