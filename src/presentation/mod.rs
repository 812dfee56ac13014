//! Template contexts and rendering helpers for the public pages.

pub mod views;
