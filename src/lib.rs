// src/lib.rs

pub mod api;
pub mod app_state;
pub mod blob;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod metadata;
pub mod model;
pub mod service;
