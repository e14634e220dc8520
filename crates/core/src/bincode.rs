use bincode::config;
use bincode::{de, error};

pub const STANDARD_LIMIT_16M: usize = 0x100_0000;

/// Encoding used for everything that has to be bit-for-bit identical
/// between nodes: citems, effects, table values
pub const STD_BINCODE_CONFIG: config::Configuration<
    config::BigEndian,
    config::Varint,
    config::Limit<STANDARD_LIMIT_16M>,
> = config::standard()
    .with_limit::<STANDARD_LIMIT_16M>()
    .with_big_endian()
    .with_variable_int_encoding();

/// Decode a value, failing if `src` has any trailing bytes
pub fn decode_whole<D: de::Decode<()>>(src: &[u8]) -> Result<D, error::DecodeError> {
    let (t, consumed) = bincode::decode_from_slice(src, STD_BINCODE_CONFIG)?;

    if consumed != src.len() {
        return Err(bincode::error::DecodeError::Other("leftover bytes"));
    }

    Ok(t)
}

pub fn encode_to_vec<E: bincode::Encode>(val: &E) -> Vec<u8> {
    bincode::encode_to_vec(val, STD_BINCODE_CONFIG).expect("encoding to a vec can't fail")
}
