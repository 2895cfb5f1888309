//! Shared types, errors, and configuration for Bursar.
//!
//! This crate provides common types used across all other crates:
//! - The authenticated principal carried through every request
//! - Application-wide error types
//! - Configuration management
//! - JWT handling for bearer principals and verification tokens
//! - Email transport and the stage-waiting notification fan-out

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod notify;
pub mod types;

pub use auth::{Principal, Role};
pub use config::AppConfig;
pub use email::{EmailError, EmailService};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService, VerificationPayload};
pub use notify::{StageNotifier, StageWaiting};
