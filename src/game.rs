pub mod chart;
pub mod difficulty;
pub mod gameplay;
pub mod graph;
pub mod hold;
pub mod judgment;
pub mod lane;
pub mod life;
pub mod note;
pub mod pattern;
pub mod scores;
pub mod scroll;
pub mod targets;
pub mod timing;
