mod email_address;

pub use self::email_address::EmailAddress;
