// Core tags module - guild-scoped name -> text snippets.
// Following the same pattern as the settings module.

pub mod pager;
pub mod tag_models;
pub mod tag_service;

pub use pager::*;
pub use tag_models::*;
pub use tag_service::*;
