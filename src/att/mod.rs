//! Attribute protocol surface: the handle table, the write/read
//! dispatcher, and the notification publisher.
//!
//! Everything here is pure. Parsing never touches hardware and never
//! consults the interlock; the service layer owns sequencing (the
//! interlock gate runs before [`dispatch::parse_write`] is even
//! called) and applies the decoded commands.

pub mod dispatch;
pub mod handles;
pub mod notify;
