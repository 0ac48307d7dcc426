// src/services/mod.rs
pub mod chart;
pub mod dataset;
pub mod fetcher;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod regression;
pub mod report;
