//! In-memory Merkle-Patricia trie roots.
//!
//! Only root computation lives here; nothing is persisted. The driver hands
//! the produced nodes to the chain database, which owns durable storage.

use crate::common::keccak256;
use crate::{Bytes, B256};
use alloy_rlp::Encodable;
use hashbrown::HashMap;

/// `keccak(rlp(""))`, the root of an empty trie.
pub const EMPTY_ROOT: B256 = B256::new([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
    0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
    0xb4, 0x21,
]);

/// Splits a byte key into nibbles, high first.
fn to_nibbles(key: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(key.len() * 2);
    for byte in key {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    nibbles
}

/// Hex-prefix encoding of a nibble path.
fn hex_prefix(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd = nibbles.len() % 2 == 1;
    let mut flag = if is_leaf { 2u8 } else { 0 };
    let mut out = Vec::with_capacity(nibbles.len() / 2 + 1);
    if odd {
        flag += 1;
        out.push(flag << 4 | nibbles[0]);
        for pair in nibbles[1..].chunks(2) {
            out.push(pair[0] << 4 | pair[1]);
        }
    } else {
        out.push(flag << 4);
        for pair in nibbles.chunks(2) {
            out.push(pair[0] << 4 | pair[1]);
        }
    }
    out
}

/// RLP item: either a string or an already-encoded payload (a node list or a
/// nested reference).
enum Item {
    Str(Vec<u8>),
    Raw(Vec<u8>),
}

fn encode_items(items: Vec<Item>) -> Vec<u8> {
    let payload_len: usize = items
        .iter()
        .map(|item| match item {
            Item::Str(s) => s.as_slice().length(),
            Item::Raw(raw) => raw.len(),
        })
        .sum();
    let mut out = Vec::with_capacity(payload_len + 9);
    alloy_rlp::Header {
        list: true,
        payload_length: payload_len,
    }
    .encode(&mut out);
    for item in items {
        match item {
            Item::Str(s) => s.as_slice().encode(&mut out),
            Item::Raw(raw) => out.extend_from_slice(&raw),
        }
    }
    out
}

struct TrieBuilder {
    nodes: HashMap<B256, Bytes>,
}

impl TrieBuilder {
    /// Reference to a child node inside its parent: inline if short,
    /// otherwise its hash (recording the node).
    fn node_ref(&mut self, encoded: Vec<u8>) -> Item {
        if encoded.len() < 32 {
            Item::Raw(encoded)
        } else {
            let hash = keccak256(&encoded);
            self.nodes.insert(hash, Bytes::from(encoded));
            Item::Str(hash.to_vec())
        }
    }

    /// Builds the node covering `entries` (sorted by nibble path), all of
    /// which agree on the first `depth` nibbles. Returns the node encoding.
    fn build(&mut self, entries: &[(Vec<u8>, Vec<u8>)], depth: usize) -> Vec<u8> {
        debug_assert!(!entries.is_empty());

        if entries.len() == 1 {
            let (path, value) = &entries[0];
            return encode_items(vec![
                Item::Str(hex_prefix(&path[depth..], true)),
                Item::Str(value.clone()),
            ]);
        }

        // Longest shared prefix below `depth`.
        let first = &entries[0].0;
        let mut shared = 0;
        'outer: loop {
            let i = depth + shared;
            if i >= first.len() {
                break;
            }
            for (path, _) in &entries[1..] {
                if i >= path.len() || path[i] != first[i] {
                    break 'outer;
                }
            }
            shared += 1;
        }

        if shared > 0 {
            let branch = self.build(entries, depth + shared);
            let child = self.node_ref(branch);
            return encode_items(vec![
                Item::Str(hex_prefix(&first[depth..depth + shared], false)),
                child,
            ]);
        }

        // Branch node: sixteen children plus the value of a key ending here.
        let mut items: Vec<Item> = Vec::with_capacity(17);
        let mut rest = entries;
        let mut branch_value = Vec::new();
        if rest[0].0.len() == depth {
            branch_value = rest[0].1.clone();
            rest = &rest[1..];
        }
        let mut start = 0;
        for nibble in 0..16u8 {
            let end = start
                + rest[start..]
                    .iter()
                    .take_while(|(path, _)| path[depth] == nibble)
                    .count();
            if end == start {
                items.push(Item::Str(Vec::new()));
            } else {
                let child = self.build(&rest[start..end], depth + 1);
                items.push(self.node_ref(child));
                start = end;
            }
        }
        items.push(Item::Str(branch_value));
        encode_items(items)
    }

    fn root(&mut self, mut entries: Vec<(Vec<u8>, Vec<u8>)>) -> B256 {
        if entries.is_empty() {
            return EMPTY_ROOT;
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let encoded = self.build(&entries, 0);
        let hash = keccak256(&encoded);
        self.nodes.insert(hash, Bytes::from(encoded));
        hash
    }
}

/// Root of a trie over arbitrary `(key, value)` pairs, plus every hashed
/// node keyed by its hash.
pub fn trie_root_and_nodes(
    pairs: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
) -> (B256, HashMap<B256, Bytes>) {
    let mut builder = TrieBuilder {
        nodes: HashMap::new(),
    };
    let entries = pairs
        .into_iter()
        .map(|(key, value)| (to_nibbles(&key), value))
        .collect();
    let root = builder.root(entries);
    (root, builder.nodes)
}

/// Trie keyed by the RLP of each item's index: the shape transaction,
/// receipt and withdrawal tries use.
pub fn ordered_trie_root_and_nodes(
    items: impl IntoIterator<Item = Vec<u8>>,
) -> (B256, HashMap<B256, Bytes>) {
    trie_root_and_nodes(items.into_iter().enumerate().map(|(index, value)| {
        let mut key = Vec::new();
        index.encode(&mut key);
        (key, value)
    }))
}

pub fn ordered_trie_root(items: impl IntoIterator<Item = Vec<u8>>) -> B256 {
    ordered_trie_root_and_nodes(items).0
}
