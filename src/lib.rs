//! videomeet - create or join named conference rooms backed by an embedded
//! conferencing widget
//!
//! This crate provides:
//! - The session controller driving one widget from join to leave
//! - The widget contract (typed events, commands, construction options)
//! - Room directory persistence and navigation links
//! - A terminal control surface
//!
//! # Architecture
//!
//! Media transport is the widget's job. The `SessionController` owns the
//! widget handle, turns its events into `SessionState`, and forwards user
//! commands back to it. The room directory and sign-in only feed the
//! controller a room id, a display name and a moderator flag.

pub mod auth;
pub mod config;
pub mod directory;
pub mod navigation;
pub mod session;
pub mod surface;
pub mod widget;
