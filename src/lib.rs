//! SRT Travel Agent
//!
//! Accepts free-text travel queries ("내일 부산 가는 SRT 기차표"), runs them
//! on background workers through a Redis-brokered job store, and exposes
//! the eventual answer (train availability plus destination weather) for
//! polling by job id.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
