//! The feed engine (§4.4 C4): fetch, parse, diff, render, and post/edit RSS/Atom
//! entries per guild.

pub mod bluesky;
pub mod hash;
pub mod poll;
pub mod template;
pub mod thumbnail;

pub use poll::poll_all_feeds;
