pub mod cutoff;
pub mod peaks;
pub mod score;
