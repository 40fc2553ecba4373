use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Board size constants
pub const BOARD_FILES: u8 = 16;
pub const BOARD_RANKS: u8 = 8;
pub const NUM_SQUARES: usize = (BOARD_FILES as usize) * (BOARD_RANKS as usize);

/// Capture point values per shape: round 1, triangle 2, square 3, pyramid 5.
pub const CAPTURE_POINTS: [u32; 4] = [1, 2, 3, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// Whether a square lies in this color's enemy half. Halves are purely
    /// rank-based: White's home is ranks 1-4, Black's is ranks 5-8.
    pub fn is_enemy_half(&self, square: Square) -> bool {
        match self {
            Color::White => square.rank >= BOARD_RANKS / 2,
            Color::Black => square.rank < BOARD_RANKS / 2,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Round,
    Triangle,
    Square,
    Pyramid,
}

impl Shape {
    pub fn index(&self) -> usize {
        match self {
            Shape::Round => 0,
            Shape::Triangle => 1,
            Shape::Square => 2,
            Shape::Pyramid => 3,
        }
    }

    pub fn capture_points(&self) -> u32 {
        CAPTURE_POINTS[self.index()]
    }
}

/// A board square. Files run A-P (16 columns), ranks 1-8. Stored zero-based,
/// displayed in algebraic-style notation, e.g. "C6".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub file: u8,
    pub rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Self {
        Square { file, rank }
    }

    pub fn in_bounds(&self) -> bool {
        self.file < BOARD_FILES && self.rank < BOARD_RANKS
    }

    /// Dense index into per-square tables.
    pub fn index(&self) -> usize {
        self.rank as usize * BOARD_FILES as usize + self.file as usize
    }

    pub fn chebyshev(&self, other: Square) -> u8 {
        let df = (self.file as i16 - other.file as i16).unsigned_abs() as u8;
        let dr = (self.rank as i16 - other.rank as i16).unsigned_abs() as u8;
        df.max(dr)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.file) as char, self.rank + 1)
    }
}

impl FromStr for Square {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let file = match chars.next() {
            Some(c @ 'A'..='P') => c as u8 - b'A',
            Some(c @ 'a'..='p') => c as u8 - b'a',
            _ => return Err(BoardError::BadSquare(s.to_string())),
        };
        let rank: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| BoardError::BadSquare(s.to_string()))?;
        if rank < 1 || rank > BOARD_RANKS {
            return Err(BoardError::BadSquare(s.to_string()));
        }
        Ok(Square::new(file, rank - 1))
    }
}

pub type PieceId = u32;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("No piece with id {0}")]
    PieceNotFound(PieceId),
    #[error("Invalid square notation: {0}")]
    BadSquare(String),
}

/// One physical token. The value (or the pyramid's face set) is fixed at
/// creation; only `square`, `captured` and `active_face` ever change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub color: Color,
    pub shape: Shape,
    value: Option<u32>,
    faces: Option<[u32; 4]>,
    pub active_face: Option<u32>,
    pub square: Option<Square>,
    pub captured: bool,
}

impl Piece {
    pub fn plain(id: PieceId, color: Color, shape: Shape, value: u32, square: Square) -> Self {
        debug_assert!(shape != Shape::Pyramid);
        Piece {
            id,
            color,
            shape,
            value: Some(value),
            faces: None,
            active_face: None,
            square: Some(square),
            captured: false,
        }
    }

    pub fn pyramid(id: PieceId, color: Color, faces: [u32; 4], square: Square) -> Self {
        Piece {
            id,
            color,
            shape: Shape::Pyramid,
            value: None,
            faces: Some(faces),
            active_face: None,
            square: Some(square),
            captured: false,
        }
    }

    /// The value used in relation checks: the fixed value for ordinary
    /// pieces, the active face for pyramids (None until a face is chosen).
    pub fn effective_value(&self) -> Option<u32> {
        match self.shape {
            Shape::Pyramid => self.active_face,
            _ => self.value,
        }
    }

    /// The four candidate face values of a pyramid.
    pub fn faces(&self) -> Option<&[u32; 4]> {
        self.faces.as_ref()
    }

    pub fn has_face(&self, face: u32) -> bool {
        self.faces.map(|fs| fs.contains(&face)).unwrap_or(false)
    }

    pub fn is_live(&self) -> bool {
        !self.captured && self.square.is_some()
    }
}

/// The full piece set, keyed by stable id. Captured pieces stay addressable
/// for history and audit; at most one live piece occupies any square.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pieces: HashMap<PieceId, Piece>,
}

impl Board {
    pub fn piece(&self, id: PieceId) -> Result<&Piece, BoardError> {
        self.pieces.get(&id).ok_or(BoardError::PieceNotFound(id))
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Result<&mut Piece, BoardError> {
        self.pieces.get_mut(&id).ok_or(BoardError::PieceNotFound(id))
    }

    /// The live piece occupying a square, if any.
    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.pieces
            .values()
            .find(|p| p.is_live() && p.square == Some(square))
    }

    pub fn live_pieces(&self, color: Color) -> Vec<&Piece> {
        let mut pieces: Vec<&Piece> = self
            .pieces
            .values()
            .filter(|p| p.is_live() && p.color == color)
            .collect();
        // Deterministic iteration order for enumeration and hashing callers.
        pieces.sort_by_key(|p| p.id);
        pieces
    }

    pub fn all_pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn insert(&mut self, piece: Piece) {
        self.pieces.insert(piece.id, piece);
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

// Traditional army values, built from the classical even/odd bases
// (2,4,6,8 for White, 3,5,7,9 for Black). Each army deploys as an
// 8-file x 3-rank block on files E-L: rounds on the front rank,
// triangles behind, squares at the back, pyramid beside the block.
const WHITE_ROUNDS: [u32; 8] = [2, 4, 6, 8, 4, 16, 36, 64];
const WHITE_TRIANGLES: [u32; 8] = [6, 20, 42, 72, 9, 25, 49, 81];
const WHITE_SQUARES: [u32; 8] = [15, 45, 91, 153, 25, 81, 169, 289];
const WHITE_PYRAMID_FACES: [u32; 4] = [4, 9, 16, 25];

const BLACK_ROUNDS: [u32; 8] = [3, 5, 7, 9, 9, 25, 49, 81];
const BLACK_TRIANGLES: [u32; 8] = [12, 30, 56, 90, 16, 36, 64, 100];
const BLACK_SQUARES: [u32; 8] = [28, 66, 120, 190, 49, 121, 225, 361];
const BLACK_PYRAMID_FACES: [u32; 4] = [36, 49, 64, 81];

/// Leftmost file of the deployment block (file E).
const ARMY_FILE: u8 = 4;

fn place_row(
    board: &mut Board,
    next_id: &mut PieceId,
    color: Color,
    shape: Shape,
    values: &[u32; 8],
    rank: u8,
) {
    for (i, &value) in values.iter().enumerate() {
        let square = Square::new(ARMY_FILE + i as u8, rank);
        board.insert(Piece::plain(*next_id, color, shape, value, square));
        *next_id += 1;
    }
}

/// Build the traditional 50-piece starting board (25 per side).
pub fn initial_board() -> Board {
    let mut board = Board::default();
    let mut next_id: PieceId = 1;

    // White: squares on rank 1, triangles on rank 2, rounds on rank 3.
    place_row(&mut board, &mut next_id, Color::White, Shape::Square, &WHITE_SQUARES, 0);
    place_row(&mut board, &mut next_id, Color::White, Shape::Triangle, &WHITE_TRIANGLES, 1);
    place_row(&mut board, &mut next_id, Color::White, Shape::Round, &WHITE_ROUNDS, 2);
    board.insert(Piece::pyramid(
        next_id,
        Color::White,
        WHITE_PYRAMID_FACES,
        Square::new(3, 0), // D1
    ));
    next_id += 1;

    // Black mirrored: rounds on rank 6, triangles on rank 7, squares on rank 8.
    place_row(&mut board, &mut next_id, Color::Black, Shape::Round, &BLACK_ROUNDS, 5);
    place_row(&mut board, &mut next_id, Color::Black, Shape::Triangle, &BLACK_TRIANGLES, 6);
    place_row(&mut board, &mut next_id, Color::Black, Shape::Square, &BLACK_SQUARES, 7);
    board.insert(Piece::pyramid(
        next_id,
        Color::Black,
        BLACK_PYRAMID_FACES,
        Square::new(12, 7), // M8
    ));

    board
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_notation_round_trip() {
        let c6: Square = "C6".parse().unwrap();
        assert_eq!(c6, Square::new(2, 5));
        assert_eq!(c6.to_string(), "C6");

        let p1: Square = "p1".parse().unwrap();
        assert_eq!(p1, Square::new(15, 0));
    }

    #[test]
    fn test_square_notation_rejects_garbage() {
        assert!("Q1".parse::<Square>().is_err());
        assert!("A9".parse::<Square>().is_err());
        assert!("A0".parse::<Square>().is_err());
        assert!("".parse::<Square>().is_err());
    }

    #[test]
    fn test_initial_board_has_fifty_pieces() {
        let board = initial_board();
        assert_eq!(board.len(), 50);
        assert_eq!(board.live_pieces(Color::White).len(), 25);
        assert_eq!(board.live_pieces(Color::Black).len(), 25);

        // Exactly one pyramid per side.
        for color in [Color::White, Color::Black] {
            let pyramids: Vec<_> = board
                .live_pieces(color)
                .into_iter()
                .filter(|p| p.shape == Shape::Pyramid)
                .collect();
            assert_eq!(pyramids.len(), 1);
            assert_eq!(pyramids[0].effective_value(), None);
        }
    }

    #[test]
    fn test_initial_board_one_piece_per_square() {
        let board = initial_board();
        let mut seen = std::collections::HashSet::new();
        for piece in board.all_pieces() {
            assert!(seen.insert(piece.square.unwrap()), "square occupied twice");
        }
    }

    #[test]
    fn test_effective_value() {
        let board = initial_board();
        let plain = board
            .live_pieces(Color::White)
            .into_iter()
            .find(|p| p.shape == Shape::Round)
            .unwrap();
        assert!(plain.effective_value().is_some());

        let mut pyramid = Piece::pyramid(99, Color::White, [4, 9, 16, 25], Square::new(0, 0));
        assert_eq!(pyramid.effective_value(), None);
        assert_eq!(pyramid.faces(), Some(&[4, 9, 16, 25]));
        pyramid.active_face = Some(16);
        assert_eq!(pyramid.effective_value(), Some(16));
        assert!(pyramid.has_face(25));
        assert!(!pyramid.has_face(36));
        assert_eq!(plain.faces(), None);
    }

    #[test]
    fn test_enemy_half_is_rank_based() {
        // White's enemy half is ranks 5-8, Black's is ranks 1-4.
        assert!(Color::White.is_enemy_half(Square::new(0, 4)));
        assert!(!Color::White.is_enemy_half(Square::new(0, 3)));
        assert!(Color::Black.is_enemy_half(Square::new(15, 0)));
        assert!(!Color::Black.is_enemy_half(Square::new(15, 4)));
    }

    #[test]
    fn test_piece_lookup_by_id() {
        let board = initial_board();
        assert!(board.piece(1).is_ok());
        assert!(matches!(board.piece(9999), Err(BoardError::PieceNotFound(9999))));
    }
}
