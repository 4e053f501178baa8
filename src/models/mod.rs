pub mod link;

pub use link::{ClickEvent, Link, NewLink};
