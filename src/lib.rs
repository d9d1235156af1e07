#[macro_use]
pub mod logging;

pub mod config;
pub mod error;
pub mod event_loop;
pub mod fs;
#[cfg(feature = "sim")]
pub mod sim;
pub mod tasklet;

pub mod prelude {
    #[cfg(feature = "sim")]
    pub use crate::sim::*;
    pub use crate::{config::*, error::*, event_loop::*, fs::*, tasklet::*};
    pub use common::*;
}
