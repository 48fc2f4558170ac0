pub mod proposal;
pub mod version;
