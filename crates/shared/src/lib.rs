//! Shared utilities and common types for the game night backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Invitation token generation and hashing
//! - JWT verification for identity provider sessions
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod validation;
