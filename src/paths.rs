use crate::board::{Board, Piece, Shape, Square};

/// Shape-specific movement validation, consumed by the engine as an opaque
/// predicate. The engine never inspects the geometry itself; it only needs
/// valid/invalid plus a reason it can surface to the caller.
pub trait PathValidator {
    fn validate_path(
        &self,
        piece: &Piece,
        from: Square,
        to: Square,
        board: &Board,
    ) -> Result<(), String>;
}

/// Reference implementation of the classical movement patterns:
/// rounds step one square diagonally, triangles move exactly two squares in
/// a straight line, squares exactly three, and the pyramid may use any of
/// the three patterns. Intermediate squares must be empty; landing-square
/// occupancy is the engine's concern, not ours.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicalPaths;

impl ClassicalPaths {
    fn check_line(&self, from: Square, to: Square, steps: u8, board: &Board) -> Result<(), String> {
        let df = to.file as i16 - from.file as i16;
        let dr = to.rank as i16 - from.rank as i16;
        let straight = df == 0 || dr == 0 || df.abs() == dr.abs();
        if !straight || df.abs().max(dr.abs()) != steps as i16 {
            return Err(format!(
                "Must move exactly {} square(s) in a straight line",
                steps
            ));
        }
        let step_f = df.signum();
        let step_r = dr.signum();
        let mut f = from.file as i16 + step_f;
        let mut r = from.rank as i16 + step_r;
        while (f, r) != (to.file as i16, to.rank as i16) {
            let square = Square::new(f as u8, r as u8);
            if board.piece_at(square).is_some() {
                return Err(format!("Path blocked at {}", square));
            }
            f += step_f;
            r += step_r;
        }
        Ok(())
    }

    fn check_round(&self, from: Square, to: Square) -> Result<(), String> {
        let df = (to.file as i16 - from.file as i16).abs();
        let dr = (to.rank as i16 - from.rank as i16).abs();
        if df == 1 && dr == 1 {
            Ok(())
        } else {
            Err("Rounds move one square diagonally".to_string())
        }
    }
}

impl PathValidator for ClassicalPaths {
    fn validate_path(
        &self,
        piece: &Piece,
        from: Square,
        to: Square,
        board: &Board,
    ) -> Result<(), String> {
        if !to.in_bounds() {
            return Err(format!("{} is off the board", to));
        }
        if from == to {
            return Err("A move must change squares".to_string());
        }
        match piece.shape {
            Shape::Round => self.check_round(from, to),
            Shape::Triangle => self.check_line(from, to, 2, board),
            Shape::Square => self.check_line(from, to, 3, board),
            Shape::Pyramid => {
                if self.check_round(from, to).is_ok()
                    || self.check_line(from, to, 2, board).is_ok()
                    || self.check_line(from, to, 3, board).is_ok()
                {
                    Ok(())
                } else {
                    Err("Pyramids move as a round, triangle, or square".to_string())
                }
            }
        }
    }
}
