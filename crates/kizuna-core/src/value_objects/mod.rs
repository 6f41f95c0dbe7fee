//! Value objects - immutable types that represent domain concepts

mod mention;
mod room_flags;
mod snowflake;

pub use mention::{extract_mention_names, Mention, MAX_MENTION_LEN};
pub use room_flags::RoomFlags;
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
