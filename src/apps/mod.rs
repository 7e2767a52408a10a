//! Example applications served by the `espresso` binary.
//!
//! - `subscribers`: a newsletter list exercising params, query schemas and bodies
//! - `accounts`: sign-up / sign-in backed by the session store and `session_protect`

pub mod accounts;
pub mod subscribers;

pub use accounts::AccountsApp;
pub use subscribers::SubscriberList;
