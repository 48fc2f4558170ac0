pub mod cache;
pub mod engine;
pub mod extract;
pub mod handlers;
pub mod normalize;
pub mod sections;
pub mod suggestions;
