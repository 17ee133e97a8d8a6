//! Backline - Subscription billing backend for studio bookings
//!
//! This crate keeps subscription state in step with the payment gateway:
//! webhook deliveries drive the dunning state machine, and background
//! workers sweep for reminders, late penalties and expired grace windows.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
