use bincode::{Decode, Encode};
use comgov_util_array_type::{array_type_fixed_size_define, array_type_fixed_size_impl_serde};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

array_type_fixed_size_define! {
    /// Height of the block being processed
    ///
    /// Proposal deadlines are absolute heights; fixed-size big-endian
    /// encoding makes deadline indexes iterate in height order.
    #[derive(Encode, Decode, Clone, Copy, Hash)]
    pub struct BlockHeight(u64);
}
array_type_fixed_size_impl_serde!(BlockHeight);

impl BlockHeight {
    /// Height `duration` blocks after `self`, unless it overflows
    pub fn checked_add_duration(self, duration: BlockDuration) -> Option<Self> {
        self.checked_add(duration.0)
    }
}

/// Number of blocks
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Display,
    From,
    Encode,
    Decode,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct BlockDuration(u64);

impl BlockDuration {
    pub const fn new(blocks: u64) -> Self {
        Self(blocks)
    }

    pub fn blocks(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

#[test]
fn block_height_add_duration() {
    assert_eq!(
        BlockHeight::new(10).checked_add_duration(BlockDuration::new(5)),
        Some(BlockHeight::new(15))
    );
    assert_eq!(
        BlockHeight::new(u64::MAX).checked_add_duration(BlockDuration::new(1)),
        None
    );
}
