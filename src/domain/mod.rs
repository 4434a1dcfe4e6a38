pub mod feature_vector;
pub mod forecast;
pub mod observation;

pub use feature_vector::*;
pub use forecast::*;
pub use observation::*;
