pub mod classical;
pub mod expressions;
pub mod parsing;
pub mod search;
pub mod world;
