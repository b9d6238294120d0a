//! Nintendo Huffman, 4-bit and 8-bit data units
//!
//! Header `0x24 | u24 size` (4-bit) or `0x28 | u24 size` (8-bit), followed
//! by the tree table and a bitstream of 32-bit words.
//!
//! The table starts at byte 4 with its size byte `ts`; it spans
//! `(ts + 1) * 2` bytes and the root node sits at byte 5. Every internal
//! node is one byte: bits 0-5 hold an offset, bit 7 marks the left child as
//! a leaf and bit 6 the right one. The two children of the node at address
//! `a` live side by side at `(a & !1) + offset * 2 + 2`; a leaf child holds
//! the symbol itself. A 0 bit in the stream goes left.
//!
//! Child pairs are only addressable 64 pairs ahead of their parent, so the
//! encoder lays the table out depth first and switches to the pair with the
//! nearest deadline whenever depth first would leave some parent out of
//! reach.

use super::output_buffer;
use crate::bits::{WordBitReader, WordBitWriter};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{
    check_plaintext_size, read_nintendo_header, write_nintendo_header, FormatId, FormatOptions,
    LzError, NibbleOrder, Result,
};
use crate::matching::ParseSettings;
use log::{debug, trace};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

const TABLE_OFFSET: usize = 4;
const ROOT: usize = TABLE_OFFSET + 1;
const MAX_OFFSET: usize = 0x3F;
const LEFT_IS_LEAF: u8 = 0x80;
const RIGHT_IS_LEAF: u8 = 0x40;

/// Huffman encoder and decoder for one data unit width
#[derive(Debug, Clone, Copy)]
pub struct Huffman {
    unit_bits: u8,
    options: FormatOptions,
}

impl Huffman {
    /// 4-bit data units, split from each byte in `options.nibble_order`
    pub fn four_bit(options: FormatOptions) -> Self {
        Self {
            unit_bits: 4,
            options,
        }
    }

    /// 8-bit data units
    pub fn eight_bit(options: FormatOptions) -> Self {
        Self {
            unit_bits: 8,
            options,
        }
    }

    fn id(&self) -> FormatId {
        if self.unit_bits == 4 {
            FormatId::Huffman4
        } else {
            FormatId::Huffman8
        }
    }

    fn tag(&self) -> u8 {
        0x20 | self.unit_bits
    }

    fn alphabet(&self) -> usize {
        1 << self.unit_bits
    }

    /// Data units of `input` in stream order
    fn symbols<'a>(&self, input: &'a [u8]) -> impl Iterator<Item = u8> + 'a {
        let four_bit = self.unit_bits == 4;
        let low_first = self.options.nibble_order == NibbleOrder::LowFirst;
        input.iter().flat_map(move |&byte| {
            let units = match (four_bit, low_first) {
                (false, _) => [byte, 0],
                (true, true) => [byte & 0xF, byte >> 4],
                (true, false) => [byte >> 4, byte & 0xF],
            };
            units.into_iter().take(if four_bit { 2 } else { 1 })
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(u8),
    Internal(usize, usize),
}

/// A code tree; `nodes[root]` is always internal
#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
    root: usize,
}

impl Tree {
    /// Merge the two rarest subtrees until one remains; ties go to the
    /// older subtree so the shape is deterministic
    fn build(frequencies: &[u64]) -> Self {
        let mut nodes = Vec::new();
        let mut heap = BinaryHeap::new();
        for (symbol, &freq) in frequencies.iter().enumerate() {
            if freq > 0 {
                heap.push(Reverse((freq, nodes.len())));
                nodes.push(Node::Leaf(symbol as u8));
            }
        }

        // a lone symbol still needs a root with two children
        let mut spare = (0..frequencies.len()).filter(|&s| frequencies[s] == 0);
        while heap.len() < 2 {
            let symbol = spare.next().unwrap_or(0);
            heap.push(Reverse((0, nodes.len())));
            nodes.push(Node::Leaf(symbol as u8));
        }

        while let (Some(Reverse((f1, a))), Some(Reverse((f2, b)))) = (heap.pop(), heap.pop()) {
            heap.push(Reverse((f1 + f2, nodes.len())));
            nodes.push(Node::Internal(a, b));
        }
        let root = nodes.len() - 1;
        Self { nodes, root }
    }

    /// Code of every symbol as a bit path from the root
    fn codes(&self, alphabet: usize) -> Vec<Vec<bool>> {
        let mut codes = vec![Vec::new(); alphabet];
        let mut stack = vec![(self.root, Vec::new())];
        while let Some((index, path)) = stack.pop() {
            match self.nodes[index] {
                Node::Leaf(symbol) => codes[symbol as usize] = path,
                Node::Internal(left, right) => {
                    let mut right_path = path.clone();
                    right_path.push(true);
                    let mut left_path = path;
                    left_path.push(false);
                    stack.push((right, right_path));
                    stack.push((left, left_path));
                }
            }
        }
        codes
    }

    fn is_leaf(&self, index: usize) -> bool {
        matches!(self.nodes[index], Node::Leaf(_))
    }

    /// Serialize the tree table, size byte included
    fn layout(&self) -> Result<Vec<u8>> {
        struct Pending {
            deadline: usize,
            node: usize,
            address: usize,
        }

        // slot k covers table bytes 2k and 2k+1; slot 0 is the size byte
        // and the root
        let mut table = vec![0u8, 0u8];
        let mut pending = vec![Pending {
            deadline: MAX_OFFSET + 1,
            node: self.root,
            address: 1,
        }];
        let mut slot = 0;

        while !pending.is_empty() {
            slot += 1;
            let internal_children = |node: usize| match self.nodes[node] {
                Node::Internal(l, r) => [l, r].into_iter().filter(|&c| !self.is_leaf(c)).count(),
                Node::Leaf(_) => 0,
            };
            let feasible = |skip: usize, new_children: usize| {
                let mut deadlines: Vec<usize> = pending
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != skip)
                    .map(|(_, p)| p.deadline)
                    .collect();
                deadlines.extend(std::iter::repeat(slot + MAX_OFFSET + 1).take(new_children));
                deadlines.sort_unstable();
                deadlines.iter().enumerate().all(|(k, &d)| d > slot + k)
            };

            let last = pending.len() - 1;
            let depth_first = pending[last].deadline >= slot
                && feasible(last, internal_children(pending[last].node));
            let pick = if depth_first {
                last
            } else {
                (0..pending.len())
                    .min_by_key(|&i| (pending[i].deadline, i))
                    .unwrap_or(last)
            };
            let parent = pending.remove(pick);
            if parent.deadline < slot {
                return Err(LzError::HuffmanTree(
                    "child pair out of reach of its parent".into(),
                ));
            }

            let Node::Internal(left, right) = self.nodes[parent.node] else {
                return Err(LzError::HuffmanTree("leaf scheduled as a parent".into()));
            };
            let mut byte = (slot - parent.address / 2 - 1) as u8;
            if self.is_leaf(left) {
                byte |= LEFT_IS_LEAF;
            }
            if self.is_leaf(right) {
                byte |= RIGHT_IS_LEAF;
            }
            table[parent.address] = byte;

            for child in [left, right] {
                match self.nodes[child] {
                    Node::Leaf(symbol) => table.push(symbol),
                    Node::Internal(..) => {
                        pending.push(Pending {
                            deadline: slot + MAX_OFFSET + 1,
                            node: child,
                            address: table.len(),
                        });
                        table.push(0);
                    }
                }
            }
        }

        // the bitstream starts word aligned
        if table.len() % 4 != 0 {
            table.extend_from_slice(&[0, 0]);
        }
        let size_byte = table.len() / 2 - 1;
        table[0] = u8::try_from(size_byte)
            .map_err(|_| LzError::HuffmanTree(format!("{size_byte} table slots")))?;
        Ok(table)
    }
}

impl Encoder for Huffman {
    fn encode(&self, input: &[u8], _settings: &ParseSettings) -> Result<Encoded> {
        check_plaintext_size(self.id(), input.len())?;

        let mut frequencies = vec![0u64; self.alphabet()];
        for symbol in self.symbols(input) {
            frequencies[symbol as usize] += 1;
        }
        let tree = Tree::build(&frequencies);
        let table = tree.layout()?;
        let codes = tree.codes(self.alphabet());
        trace!("{}: {} table bytes", self.id(), table.len());

        let mut bits = WordBitWriter::new(self.options.bit_order, self.options.byte_order);
        let mut symbol_count = 0;
        for symbol in self.symbols(input) {
            for &bit in &codes[symbol as usize] {
                bits.write_bit(bit)?;
            }
            symbol_count += 1;
        }
        let stream = bits.finish()?;

        let mut out = Vec::with_capacity(TABLE_OFFSET + table.len() + stream.len());
        write_nintendo_header(&mut out, self.tag(), input.len());
        out.extend_from_slice(&table);
        out.extend_from_slice(&stream);

        debug!(
            "{}: {} -> {} bytes ({} symbols)",
            self.id(),
            input.len(),
            out.len(),
            symbol_count
        );
        Ok(Encoded {
            data: out,
            literal_count: symbol_count,
            match_count: 0,
            longest_match: 0,
        })
    }
}

impl Decoder for Huffman {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let size = read_nintendo_header(input, self.tag())?;
        let tree_end = input
            .get(TABLE_OFFSET)
            .map(|&ts| TABLE_OFFSET + (ts as usize + 1) * 2)
            .filter(|&end| end <= input.len())
            .ok_or(LzError::TruncatedStream {
                needed: TABLE_OFFSET + 2,
                available: input.len(),
            })?;

        let mut bits = WordBitReader::new(
            &input[tree_end..],
            self.options.bit_order,
            self.options.byte_order,
        );
        let mut out = output_buffer(size);
        let mut pending: Option<u8> = None;
        let mut node = ROOT;

        while out.len() < size {
            let bit = bits.read_bit()?;
            let flags = input[node];
            let child = (node & !1) + (flags as usize & MAX_OFFSET) * 2 + 2 + bit as usize;
            if child >= tree_end {
                return Err(LzError::HuffmanTree(format!(
                    "node at {node:#x} points past the table end {tree_end:#x}"
                )));
            }
            let leaf_flag = if bit { RIGHT_IS_LEAF } else { LEFT_IS_LEAF };
            if flags & leaf_flag == 0 {
                node = child;
                continue;
            }

            node = ROOT;
            let symbol = input[child];
            if self.unit_bits == 8 {
                out.push(symbol);
                continue;
            }
            let nibble = symbol & 0xF;
            pending = match pending.take() {
                None => Some(nibble),
                Some(first) => {
                    out.push(match self.options.nibble_order {
                        NibbleOrder::LowFirst => first | nibble << 4,
                        NibbleOrder::HighFirst => first << 4 | nibble,
                    });
                    None
                }
            };
        }

        debug!("{}: {} -> {} bytes", self.id(), input.len(), out.len());
        Ok(out)
    }
}
