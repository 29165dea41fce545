pub mod identity;

pub use identity::{IdentityResolver, TeamAliasEntry, TeamAliases};
