mod card;
mod membership;
mod user;

pub use self::card::MembershipCard;
pub use self::membership::{
    AnnualMembership, MembershipHistory, MembershipPolicy, NewAnnualMembership,
};
pub use self::user::User;
