// SPDX-License-Identifier: MIT

use std::ops;

pub use ::redb_bincode;
use redb_bincode::{ReadableTable, StorageError, Table};

/// Define a typed `redb` table
///
/// Expands to a module named after the table, exporting its `Key` and
/// `Value` types and the `TABLE` definition. The table name in the database
/// is the module name, so renaming a table is a database migration.
#[macro_export]
macro_rules! def_table {
    ($(#[$outer:meta])*
        $name:ident : $k:ty => $v:ty) => {
        #[allow(unused)]
        $(#[$outer])*
        pub mod $name {
            use super::*;
            pub type Key = $k;
            pub type Value = $v;
            pub type Definition<'a> = $crate::redb_bincode::TableDefinition<'a, Key, Value>;
            pub trait ReadableTable: $crate::redb_bincode::ReadableTable<Key, Value> {}
            impl<RT> ReadableTable for RT where RT: $crate::redb_bincode::ReadableTable<Key, Value> {}
            pub type Table<'a> = $crate::redb_bincode::Table<'a, Key, Value>;
            pub const TABLE: Definition = $crate::redb_bincode::TableDefinition::new(stringify!($name));
        }
    };
}

/// Collect keys of a range, in key order
pub fn keys_in_range<K, V>(
    tbl: &impl ReadableTable<K, V>,
    range: impl ops::RangeBounds<K>,
) -> Result<Vec<K>, StorageError>
where
    K: bincode::Decode<()> + bincode::Encode,
    V: bincode::Decode<()> + bincode::Encode,
{
    tbl.range(range)?
        .map(|kv| {
            let (k, _) = kv?;
            Ok(k.value())
        })
        .collect()
}

/// Remove all entries in a range, returning number of removed entries
pub fn remove_range<K, V>(
    tbl: &mut Table<'_, K, V>,
    range: impl ops::RangeBounds<K>,
) -> Result<usize, StorageError>
where
    K: bincode::Decode<()> + bincode::Encode,
    V: bincode::Decode<()> + bincode::Encode,
{
    let keys = keys_in_range(tbl, range)?;

    for key in &keys {
        tbl.remove(key)?;
    }

    Ok(keys.len())
}
