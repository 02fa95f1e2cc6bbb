pub mod consts;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod motion;
pub mod noise;
pub mod parallel;
pub mod pipeline;
pub mod svt;
