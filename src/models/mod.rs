pub mod charge;
pub mod subscription;
pub mod user;

pub use charge::*;
pub use subscription::*;
pub use user::*;
