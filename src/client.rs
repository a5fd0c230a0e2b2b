mod commerce;
mod email_client;
mod pass_signer;
mod storage;

pub use self::commerce::{
    BillingAddress, CommerceClient, CommerceError, LineItem, Order, OrderFilters, OrderPager,
    OrdersPage, PAGE_SIZE,
};
pub use self::email_client::{CardEmail, EmailClient};
pub use self::pass_signer::{PassRequest, PassSignerClient};
pub use self::storage::CardStorage;
