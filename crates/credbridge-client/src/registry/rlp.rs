//! Minimal RLP encoding for legacy transaction signing.
//!
//! Only encoding is needed: the node returns transaction data as JSON, and
//! the only RLP the bridge produces is the signing payload and the signed
//! raw transaction.

/// An RLP item: a byte string or a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item {
    Bytes(Vec<u8>),
    List(Vec<Item>),
}

impl Item {
    /// An unsigned integer as its minimal big-endian byte string (zero is
    /// the empty string).
    pub(crate) fn uint(value: u128) -> Self {
        Item::Bytes(trim_leading_zeros(&value.to_be_bytes()).to_vec())
    }

    /// A big-endian unsigned integer of arbitrary width, leading zeros removed.
    pub(crate) fn uint_bytes(be: &[u8]) -> Self {
        Item::Bytes(trim_leading_zeros(be).to_vec())
    }
}

/// Encode an item.
pub(crate) fn encode(item: &Item) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(item, &mut out);
    out
}

fn encode_into(item: &Item, out: &mut Vec<u8>) {
    match item {
        Item::Bytes(bytes) => {
            if bytes.len() == 1 && bytes[0] < 0x80 {
                out.push(bytes[0]);
            } else {
                encode_header(0x80, bytes.len(), out);
                out.extend_from_slice(bytes);
            }
        }
        Item::List(items) => {
            let mut payload = Vec::new();
            for child in items {
                encode_into(child, &mut payload);
            }
            encode_header(0xc0, payload.len(), out);
            out.extend(payload);
        }
    }
}

fn encode_header(offset: u8, len: usize, out: &mut Vec<u8>) {
    if len < 56 {
        out.push(offset + len as u8);
    } else {
        let len_bytes = (len as u64).to_be_bytes();
        let len_bytes = trim_leading_zeros(&len_bytes);
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(b: &[u8]) -> Item {
        Item::Bytes(b.to_vec())
    }

    #[test]
    fn encodes_reference_vectors() {
        assert_eq!(encode(&bytes(b"dog")), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(encode(&bytes(b"")), vec![0x80]);
        assert_eq!(encode(&Item::List(vec![])), vec![0xc0]);
        assert_eq!(encode(&bytes(&[0x0f])), vec![0x0f]);
        assert_eq!(encode(&bytes(&[0x80])), vec![0x81, 0x80]);
        assert_eq!(
            encode(&Item::List(vec![bytes(b"cat"), bytes(b"dog")])),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
    }

    #[test]
    fn integers_are_minimal() {
        assert_eq!(encode(&Item::uint(0)), vec![0x80]);
        assert_eq!(encode(&Item::uint(15)), vec![0x0f]);
        assert_eq!(encode(&Item::uint(1024)), vec![0x82, 0x04, 0x00]);
        assert_eq!(encode(&Item::uint_bytes(&[0, 0, 0x01])), vec![0x01]);
    }

    #[test]
    fn long_strings_use_length_of_length() {
        let text = b"Lorem ipsum dolor sit amet, consectetur adipisicing elit";
        let encoded = encode(&bytes(text));
        assert_eq!(&encoded[..2], &[0xb8, 0x38]);
        assert_eq!(&encoded[2..], &text[..]);
    }
}
