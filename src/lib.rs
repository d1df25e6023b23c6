pub mod cli;
pub mod error;
pub mod git;
pub mod labels;
pub mod logging;
pub mod mine;
pub mod model;
pub mod source;
pub mod util;
