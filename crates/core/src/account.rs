use core::fmt;

use bincode::{Decode, Encode};
use comgov_util_array_type::{
    array_type_define, array_type_impl_base32_str, array_type_impl_debug_as_display,
    array_type_impl_rand, array_type_impl_serde, array_type_impl_zero_default,
};

array_type_define! {
    /// Account identifier
    ///
    /// Opaque to the engine: the host derives it from whatever key material
    /// it uses to authenticate transactions.
    #[derive(Encode, Decode, Clone, Copy, Hash)]
    pub struct AccountId[32];
}

array_type_impl_zero_default!(AccountId);
array_type_impl_base32_str!(AccountId);
array_type_impl_serde!(AccountId);
array_type_impl_debug_as_display!(AccountId);
array_type_impl_rand!(AccountId);

impl AccountId {
    pub fn generate() -> Self {
        rand::random()
    }

    pub fn to_short(self) -> AccountIdShort {
        AccountIdShort(self)
    }
}

/// Abbreviated [`AccountId`] for log output
pub struct AccountIdShort(AccountId);

impl fmt::Display for AccountIdShort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}...{}",
            data_encoding::BASE32_DNSCURVE.encode_display(&self.0.as_slice()[0..4]),
            data_encoding::BASE32_DNSCURVE.encode_display(&self.0.as_slice()[28..32])
        ))
    }
}

#[test]
fn account_id_str_roundtrip() {
    let account = AccountId::generate();
    let s = account.to_string();

    assert_eq!(s.parse::<AccountId>().ok(), Some(account));
    assert!("too-short".parse::<AccountId>().is_err());
}
