//! One module per subcommand group.

pub mod ask;
pub mod search;
pub mod status;
pub mod sync;
