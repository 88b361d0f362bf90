pub mod bed;
pub mod cutoff;
pub mod gaps;
pub mod genome;
pub mod io;
pub mod monte_carlo;
pub mod penalty;
pub mod scoring;
pub mod segments;
pub mod significance;
