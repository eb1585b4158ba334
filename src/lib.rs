//! # Postdeck
//!
//! A terminal browser for a blog's posts, usable locally or served to
//! remote terminals.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Browser (Splash → Listing → Detail) → Render → UI
//! ```
//!
//! - [`fetcher`]: lists the remote post directory and downloads each post
//! - [`normalizer`]: YAML frontmatter parsing into [`Post`](domain::Post)
//! - [`render`]: markup stripping, link footnotes and markdown formatting
//! - [`tui`]: the screen state machine and its ratatui views
//! - [`remote`]: one independent browser per TCP connection
//!
//! ## Quick Start
//!
//! ```bash
//! # Browse in this terminal
//! postdeck
//!
//! # Print the posts, newest first
//! postdeck list
//!
//! # Serve to remote terminals, then connect with
//! # socat -,raw,echo=0 tcp:localhost:23234
//! postdeck serve --port 23234
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the post
/// fetcher and render pipeline shared by every session.
pub mod app;

/// Command-line interface using clap.
///
/// - `tui [--latest]` - Launch the TUI (default)
/// - `serve [--port]` - Serve the TUI over TCP
/// - `list` - Print posts
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/postdeck/config.toml`, supporting:
/// - The post source (owner, repository, path, suffix)
/// - Render style and UI text
/// - Custom colors (named or hex) and keybindings
pub mod config;

/// Core domain model: [`Post`](domain::Post).
pub mod domain;

/// Listing and downloading posts.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait over the remote source
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`PostFetcher`](fetcher::posts::PostFetcher): One fetch cycle with bounded concurrency
pub mod fetcher;

/// Frontmatter parsing and date normalization.
pub mod normalizer;

/// Remote terminal sessions over TCP.
pub mod remote;

/// Turning a post body into wrapped, styled terminal lines.
pub mod render;

/// Terminal user interface.
///
/// Splash screen with a blinking prompt, a filterable post listing, and a
/// scrollable detail view.
///
/// Keybindings: Enter opens, j/k navigate, / filters, Esc goes back, q quits.
pub mod tui;
