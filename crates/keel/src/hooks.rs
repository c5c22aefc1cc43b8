//! Hooks every app defines.
//!
//! Lifecycle order:
//!
//! ```text
//! setup():  pre_setup → extensions load → post_setup
//! run():    pre_run → pre_argument_parsing → parse → post_argument_parsing
//!           → run callback → post_run
//! render(): pre_render → output handler → post_render
//! close():  pre_close → post_close → handler teardown → hooks closed
//! ```
//!
//! Callables receive `&mut App`. Registering against a hook while it runs
//! is rejected; see [`keel_core::HookDispatcher`] for ordering and failure
//! rules.

pub use keel_core::{HookError, HookState};

pub const PRE_SETUP: &str = "pre_setup";
pub const POST_SETUP: &str = "post_setup";
pub const PRE_RUN: &str = "pre_run";
pub const POST_RUN: &str = "post_run";
pub const PRE_ARGUMENT_PARSING: &str = "pre_argument_parsing";
pub const POST_ARGUMENT_PARSING: &str = "post_argument_parsing";
pub const PRE_CLOSE: &str = "pre_close";
pub const POST_CLOSE: &str = "post_close";
pub const PRE_RENDER: &str = "pre_render";
pub const POST_RENDER: &str = "post_render";

/// Hooks defined by [`AppBuilder::build`](crate::AppBuilder::build), in order.
pub const BUILTIN_HOOKS: &[&str] = &[
    PRE_SETUP,
    POST_SETUP,
    PRE_RUN,
    POST_RUN,
    PRE_ARGUMENT_PARSING,
    POST_ARGUMENT_PARSING,
    PRE_CLOSE,
    POST_CLOSE,
    PRE_RENDER,
    POST_RENDER,
];
