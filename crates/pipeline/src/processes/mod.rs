//! The box system's process applications.

mod negotiations;
mod shippings;
mod users;

pub use negotiations::NegotiationsProcess;
pub use shippings::ShippingsProcess;
pub use users::UsersProcess;
