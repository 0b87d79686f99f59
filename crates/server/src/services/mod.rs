//! Business services sitting between the HTTP handlers and the
//! repository.

pub mod auth;
pub mod customers;
pub mod email;

pub use auth::{AuthError, AuthService};
pub use customers::{AddressInput, CustomerService, Registration};
pub use email::{Mailer, SmtpMailer};
