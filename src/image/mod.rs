pub mod border;
pub mod f64;
pub mod io;
pub mod traits;

pub use self::border::reflect_index;
pub use self::f64::ImageF64;
pub use self::traits::{ImageView, Neighbors4, Rows};
