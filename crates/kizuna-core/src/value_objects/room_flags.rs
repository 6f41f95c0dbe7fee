//! Per-room behaviour flags

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Stored as INTEGER in the database.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RoomFlags: i32 {
        /// Plain members may post; moderators and owners always can.
        const MEMBERS_CAN_CHAT = 1 << 0;

        const DEFAULT = Self::MEMBERS_CAN_CHAT.bits();
    }
}

impl RoomFlags {
    #[inline]
    pub fn members_can_chat(&self) -> bool {
        self.contains(Self::MEMBERS_CAN_CHAT)
    }

    /// Build from a raw database value, dropping unknown bits.
    pub fn from_db(bits: i32) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl Default for RoomFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Serialize for RoomFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.bits())
    }
}

impl<'de> Deserialize<'de> for RoomFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        i32::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}
