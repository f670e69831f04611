//! External publishers: the static-site writer and the SMTP email digest.
//! Both are real, working modules — "interface only" in the specification
//! bounds their feature surface, not whether they run.

mod email;
mod site;

pub use email::send_digest;
pub use site::build_site;
