//! Katha Vault Core - domain types and algorithms.
//!
//! This crate holds everything about serialized fiction that does not touch
//! I/O: novels and chapters, comment trees, the social feed, user profiles,
//! the home page layout, moderation search and form validation.
//!
//! # Architecture
//!
//! The server crate owns persistence and HTTP. Everything here operates on
//! plain values so it can be unit tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, email addresses and status enums
//! - [`novel`] - Novels, chapters, trending and discovery
//! - [`comment`] - Nested comment trees (add, remove, like, flatten)
//! - [`post`] - Social feed posts
//! - [`user`] - User profiles
//! - [`layout`] - Home page layout config and section building
//! - [`moderation`] - Admin search, filtering and dashboard stats
//! - [`validation`] - Form field rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod comment;
pub mod layout;
pub mod moderation;
pub mod novel;
pub mod post;
pub mod types;
pub mod user;
pub mod validation;

pub use comment::{Comment, CommentView};
pub use layout::{HomeLayoutConfig, HomeSection};
pub use novel::{Chapter, Novel};
pub use post::{Post, PostView};
pub use types::*;
pub use user::User;
pub use validation::{ValidationErrors, Validator};
