mod credentials;
mod guards;

pub use self::credentials::Credentials;
pub use self::guards::{Member, Operator};
