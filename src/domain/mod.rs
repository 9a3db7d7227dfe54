pub mod grid;
pub mod level;
pub mod tile;
