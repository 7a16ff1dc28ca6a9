//! # clipmark-provider
//!
//! Google Docs/Drive document provider for clipmark.
//!
//! This crate provides:
//! - The Google OAuth2 client (code exchange, refresh, userinfo)
//! - The Docs/Drive implementation of [`clipmark_core::DocumentProvider`]
//! - A scriptable in-memory mock for tests
//!
//! Credentials are resolved per request from each user's stored tokens
//! and threaded explicitly; there is no shared global client state.

pub mod docs;
pub mod mock;
pub mod oauth;

// Re-export core types
pub use clipmark_core::*;

pub use docs::{marker_name, parse_marker_name, GoogleDocsProvider};
pub use mock::MockProvider;
pub use oauth::{GoogleOAuthClient, GoogleOAuthConfig, GoogleUserInfo, ProviderTokens};
