mod credentials;
mod factory;
mod member;

pub use credentials::Credentials;
pub use factory::{MemberConnectionFactory, MemberPoolConfig, PgMemberConnectionFactory};
pub use member::MemberConnection;

#[cfg(test)]
pub(crate) use member::test_member;
