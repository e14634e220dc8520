use comgov_core::Weight;
use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_util_db::def_table;

def_table! {
    /// Height of the last fully processed block
    app_last_height: () => BlockHeight
}

def_table! {
    /// Height of a block whose processing started but never finished
    ///
    /// Each block is applied in several transactions; a leftover entry means
    /// the state holds only part of that block.
    app_block_in_progress: () => BlockHeight
}

def_table! {
    /// Bonded stake, as last reported by the host
    app_stake: AccountId => Weight
}
