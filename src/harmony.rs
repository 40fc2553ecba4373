use crate::board::{Board, Color, PieceId, Square};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The three classical proportions a harmony may form, with outer values
/// a, b around the spatially middle value m.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proportion {
    /// 2m = a + b
    Arithmetic,
    /// m^2 = a * b
    Geometric,
    /// 2ab = m(a + b)
    Harmonic,
}

impl fmt::Display for Proportion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Proportion::Arithmetic => write!(f, "arithmetic"),
            Proportion::Geometric => write!(f, "geometric"),
            Proportion::Harmonic => write!(f, "harmonic"),
        }
    }
}

/// Spatial constraint on the three pieces beyond collinearity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpacingRule {
    /// The middle piece sits exactly one square from each outer piece.
    #[default]
    Adjacent,
    /// Both middle-to-outer distances are equal and in {1, 2}.
    EqualSpacing,
    /// Collinearity alone suffices.
    CollinearOnly,
}

/// A detected harmony: the three piece ids in a-m-b order and the values
/// that satisfied the proportion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harmony {
    pub pieces: [PieceId; 3],
    pub proportion: Proportion,
    /// (a, m, b) with m the spatially middle piece's value.
    pub values: [u32; 3],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HarmonyError {
    #[error("A harmony needs exactly three pieces")]
    NotThreePieces,
    #[error("Piece at {0} is outside the enemy half")]
    OutsideEnemyHalf(Square),
    #[error("Piece {0} is not on the board")]
    NotLive(PieceId),
    #[error("The three pieces are not collinear")]
    NotCollinear,
    #[error("No piece lies spatially between the other two")]
    NoMiddlePiece,
    #[error("Spacing violates the {0:?} rule")]
    BadSpacing(SpacingRule),
    #[error("Piece {0} has no effective value (pyramid face not chosen)")]
    NoEffectiveValue(PieceId),
    #[error("Two of the three values are equal")]
    EqualValues,
    #[error("Values {0}, {1}, {2} form no valid proportion")]
    NoProportion(u32, u32, u32),
}

fn collinear(a: Square, b: Square, c: Square) -> bool {
    let same_rank = a.rank == b.rank && b.rank == c.rank;
    let same_file = a.file == b.file && b.file == c.file;
    let diagonal = {
        let d1f = (a.file as i16 - b.file as i16).abs();
        let d1r = (a.rank as i16 - b.rank as i16).abs();
        let d2f = (b.file as i16 - c.file as i16).abs();
        let d2r = (b.rank as i16 - c.rank as i16).abs();
        // Constant diagonal slope: both legs at 45 degrees, no direction kink.
        let cross = (b.file as i32 - a.file as i32) * (c.rank as i32 - a.rank as i32)
            - (b.rank as i32 - a.rank as i32) * (c.file as i32 - a.file as i32);
        d1f == d1r && d2f == d2r && cross == 0
    };
    same_rank || same_file || diagonal
}

fn between(x: u8, lo: u8, hi: u8) -> bool {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    lo <= x && x <= hi
}

/// Index of the piece whose file and rank each lie between (inclusive) the
/// other two pieces'.
fn middle_index(squares: &[Square; 3]) -> Option<usize> {
    (0..3).find(|&i| {
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;
        between(squares[i].file, squares[j].file, squares[k].file)
            && between(squares[i].rank, squares[j].rank, squares[k].rank)
    })
}

fn spacing_ok(middle: Square, outer1: Square, outer2: Square, rule: SpacingRule) -> bool {
    let d1 = middle.chebyshev(outer1);
    let d2 = middle.chebyshev(outer2);
    match rule {
        SpacingRule::Adjacent => d1 == 1 && d2 == 1,
        SpacingRule::EqualSpacing => d1 == d2 && (1..=2).contains(&d1),
        SpacingRule::CollinearOnly => true,
    }
}

/// Test (a, m, b) against the three proportions, in the fixed order
/// arithmetic, geometric, harmonic. First match wins.
fn classify(a: u32, m: u32, b: u32) -> Option<Proportion> {
    let (a64, m64, b64) = (a as u64, m as u64, b as u64);
    if 2 * m64 == a64 + b64 {
        return Some(Proportion::Arithmetic);
    }
    if m64 * m64 == a64 * b64 {
        return Some(Proportion::Geometric);
    }
    if a != 0 && m != 0 && b != 0 && 2 * a64 * b64 == m64 * (a64 + b64) {
        return Some(Proportion::Harmonic);
    }
    None
}

/// Check whether the three named pieces of `color` currently form a valid
/// harmony: all live in the enemy half, collinear, with a spatially middle
/// piece at legal spacing, and values in one of the classical proportions.
pub fn detect(
    board: &Board,
    color: Color,
    ids: &[PieceId],
    rule: SpacingRule,
) -> Result<Harmony, HarmonyError> {
    if ids.len() != 3 {
        return Err(HarmonyError::NotThreePieces);
    }

    let mut squares = [Square::new(0, 0); 3];
    let mut values = [None; 3];
    for (i, &id) in ids.iter().enumerate() {
        let piece = board.piece(id).map_err(|_| HarmonyError::NotLive(id))?;
        if !piece.is_live() || piece.color != color {
            return Err(HarmonyError::NotLive(id));
        }
        let square = piece.square.expect("live piece has a square");
        if !color.is_enemy_half(square) {
            return Err(HarmonyError::OutsideEnemyHalf(square));
        }
        squares[i] = square;
        values[i] = piece.effective_value();
    }

    if !collinear(squares[0], squares[1], squares[2]) {
        return Err(HarmonyError::NotCollinear);
    }

    let mid = middle_index(&squares).ok_or(HarmonyError::NoMiddlePiece)?;
    let mut out1 = (mid + 1) % 3;
    let mut out2 = (mid + 2) % 3;
    // Outer pieces in board order, so (a, m, b) reads left-to-right,
    // bottom-to-top. The proportions are symmetric in a and b.
    if squares[out1].index() > squares[out2].index() {
        std::mem::swap(&mut out1, &mut out2);
    }

    if !spacing_ok(squares[mid], squares[out1], squares[out2], rule) {
        return Err(HarmonyError::BadSpacing(rule));
    }

    let m = values[mid].ok_or(HarmonyError::NoEffectiveValue(ids[mid]))?;
    let a = values[out1].ok_or(HarmonyError::NoEffectiveValue(ids[out1]))?;
    let b = values[out2].ok_or(HarmonyError::NoEffectiveValue(ids[out2]))?;
    if a == m || m == b || a == b {
        return Err(HarmonyError::EqualValues);
    }

    let proportion = classify(a, m, b).ok_or(HarmonyError::NoProportion(a, m, b))?;
    Ok(Harmony {
        pieces: [ids[out1], ids[mid], ids[out2]],
        proportion,
        values: [a, m, b],
    })
}

/// Enumerate every valid harmony a color can currently claim. Exhaustive
/// over enemy-half candidates; the candidate set never exceeds 25 pieces.
pub fn enumerate(board: &Board, color: Color, rule: SpacingRule) -> Vec<Harmony> {
    let candidates: Vec<PieceId> = board
        .live_pieces(color)
        .into_iter()
        .filter(|p| color.is_enemy_half(p.square.expect("live piece has a square")))
        .map(|p| p.id)
        .collect();

    let mut harmonies = Vec::new();
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            for k in (j + 1)..candidates.len() {
                let ids = [candidates[i], candidates[j], candidates[k]];
                if let Ok(h) = detect(board, color, &ids, rule) {
                    harmonies.push(h);
                }
            }
        }
    }
    harmonies
}

/// Whether any valid harmony currently exists for this color.
pub fn exists(board: &Board, color: Color, rule: SpacingRule) -> bool {
    !enumerate(board, color, rule).is_empty()
}

/// Re-validate a previously declared harmony against the current board:
/// the same three pieces must still pass the full check.
pub fn revalidate(board: &Board, color: Color, pieces: &[PieceId; 3], rule: SpacingRule) -> bool {
    detect(board, color, pieces, rule).is_ok()
}
