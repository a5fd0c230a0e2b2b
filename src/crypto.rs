mod serial;
mod signature;
mod signing_key;

pub use self::serial::CardSerial;
pub use self::signature::CardSignature;
pub use self::signing_key::SigningKey;
