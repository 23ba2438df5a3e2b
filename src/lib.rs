pub mod api;
pub mod cache;
pub mod config;
pub mod dialog;
pub mod display;
pub mod entity;
pub mod error;
pub mod location;
pub mod mutation;
pub mod page;
pub mod query;
pub mod view;


pub use api::{Backend, RestClient};
pub use config::Config;
pub use error::{Error, Result};
pub use location::{Location, QueryState};
pub use page::PostsManager;
