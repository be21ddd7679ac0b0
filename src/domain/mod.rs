pub mod forecast;
pub mod reading;
pub mod recommendation;
pub mod weather;

pub use forecast::*;
pub use reading::*;
pub use recommendation::*;
pub use weather::*;
