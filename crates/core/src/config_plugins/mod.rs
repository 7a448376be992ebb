//! Built-in configuration layers, applied in registry order: base first,
//! then css, prod, app and transpile on top.

pub mod app;
pub mod base;
pub mod css;
pub mod prod;
pub mod transpile;
