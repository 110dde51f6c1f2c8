pub mod context;
pub mod event;
pub mod fixtures;
pub mod model;
pub mod observer;
