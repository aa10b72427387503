//! tuya-device-gateway - Local gateway for a Tuya cloud device
//!
//! Accepts power-on / power-off requests over HTTP and relays them as
//! signed commands to the Tuya OpenAPI, managing the access token lifecycle.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod tuya;
