//! Zobrist-style position hashing.
//!
//! Two independent engine instances must produce identical hashes for
//! identical positions (clients cross-check repetition claims against each
//! other), so the table is filled by a fixed-seed generator with a pinned
//! algorithm rather than a library RNG whose stream could change between
//! versions.

use crate::board::{Board, Color, Shape, Square, NUM_SQUARES};

const SHAPES: usize = 4;
const COLORS: usize = 2;

/// Seed for the shared process-wide table. Changing this breaks hash
/// agreement with every existing session.
pub const DEFAULT_SEED: u64 = 0x5249_5448_4d4f_0001;

/// xorshift128+ over two 64-bit state words.
struct XorShift128 {
    s0: u64,
    s1: u64,
}

impl XorShift128 {
    fn new(seed: u64) -> Self {
        // Expand the single seed word into two non-zero state words.
        let mut rng = XorShift128 {
            s0: splitmix64(seed),
            s1: splitmix64(seed.wrapping_add(0x9e37_79b9_7f4a_7c15)),
        };
        if rng.s0 == 0 && rng.s1 == 0 {
            rng.s1 = 1;
        }
        rng
    }

    fn next(&mut self) -> u64 {
        let mut x = self.s0;
        let y = self.s1;
        self.s0 = y;
        x ^= x << 23;
        self.s1 = x ^ y ^ (x >> 17) ^ (y >> 26);
        self.s1.wrapping_add(y)
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Random-constant table: one u64 per (shape, color, square) triple, plus a
/// single word toggled when Black is to move.
#[derive(Clone)]
pub struct Zobrist {
    table: Vec<u64>, // SHAPES * COLORS * NUM_SQUARES entries
    black_to_move: u64,
}

impl Zobrist {
    pub fn new(seed: u64) -> Self {
        let mut rng = XorShift128::new(seed);
        let table = (0..SHAPES * COLORS * NUM_SQUARES)
            .map(|_| rng.next())
            .collect();
        Zobrist {
            table,
            black_to_move: rng.next(),
        }
    }

    fn entry(&self, shape: usize, color: usize, square: Square) -> u64 {
        self.table[(shape * COLORS + color) * NUM_SQUARES + square.index()]
    }

    /// Hash a position from scratch: XOR of the entries for every live
    /// piece, XORed with the side word when Black is to move.
    pub fn hash(&self, board: &Board, to_move: Color) -> u64 {
        let mut h = 0u64;
        for piece in board.all_pieces() {
            if !piece.is_live() {
                continue;
            }
            let square = piece.square.unwrap();
            h ^= self.entry(piece.shape.index(), piece.color.index(), square);
        }
        if to_move == Color::Black {
            h ^= self.black_to_move;
        }
        h
    }

    /// Incremental update after a move. Must agree bit-for-bit with
    /// `hash` on the resulting position; the validator recomputes from
    /// scratch and this path exists as a cross-check.
    pub fn update(
        &self,
        previous: u64,
        mover_shape: Shape,
        mover_color: Color,
        from: Square,
        to: Square,
        captured: Option<(Shape, Color, Square)>,
    ) -> u64 {
        let mut h = previous;
        h ^= self.entry(mover_shape.index(), mover_color.index(), from);
        h ^= self.entry(mover_shape.index(), mover_color.index(), to);
        if let Some((shape, color, square)) = captured {
            h ^= self.entry(shape.index(), color.index(), square);
        }
        // The side to move flips on every ply.
        h ^ self.black_to_move
    }
}

impl Default for Zobrist {
    fn default() -> Self {
        Zobrist::new(DEFAULT_SEED)
    }
}

/// Fixed-width serialization for storage in move history.
pub fn format_hash(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Threefold repetition over the stored per-ply hash list: the latest hash
/// is counted against the whole list, itself included.
pub fn is_threefold(hashes: &[String]) -> bool {
    match hashes.last() {
        Some(current) => {
            hashes.len() >= 3 && hashes.iter().filter(|h| *h == current).count() >= 3
        }
        None => false,
    }
}
