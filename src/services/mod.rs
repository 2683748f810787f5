pub mod attachments;
pub mod categories;
pub mod comments;
pub mod tickets;
pub mod users;
pub mod votes;
