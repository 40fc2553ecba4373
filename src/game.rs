use crate::board::{initial_board, Board, BoardError, Color, Piece, PieceId, Shape, Square};
use crate::board::{BOARD_FILES, BOARD_RANKS};
use crate::harmony::{self, Proportion, SpacingRule};
use crate::paths::PathValidator;
use crate::relation::{self, Relation};
use crate::zobrist::{format_hash, is_threefold, Zobrist};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Number of no-progress plies after which a draw may be claimed.
pub const FIFTY_MOVE_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Playing,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HarmonyRecheck {
    /// The originally declared triple must still hold.
    #[default]
    ExactDeclaration,
    /// Any currently valid harmony for the declaring color confirms.
    AnyHarmony,
}

/// Rule configuration, mutated only through the whitelisted `SetConfig`
/// action. Time control is carried but not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    pub point_victory_enabled: bool,
    pub point_threshold: u32,
    pub repetition_rule_enabled: bool,
    pub fifty_move_rule_enabled: bool,
    pub harmony_recheck: HarmonyRecheck,
    pub harmony_spacing: SpacingRule,
    pub time_control: Option<u64>,
    pub white_seat: Option<String>,
    pub black_seat: Option<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            point_victory_enabled: false,
            point_threshold: 50,
            repetition_rule_enabled: true,
            fifty_move_rule_enabled: true,
            harmony_recheck: HarmonyRecheck::default(),
            harmony_spacing: SpacingRule::default(),
            time_control: None,
            white_seat: None,
            black_seat: None,
        }
    }
}

impl RulesConfig {
    /// Apply one key/value update. Field names are whitelisted and each
    /// value is type- and range-checked before anything mutates.
    pub fn apply(&mut self, field: &str, value: &Value) -> Result<(), GameError> {
        fn expect_bool(field: &str, value: &Value) -> Result<bool, GameError> {
            value.as_bool().ok_or_else(|| GameError::InvalidConfig {
                field: field.to_string(),
                reason: "expected a boolean".to_string(),
            })
        }

        match field {
            "point_victory_enabled" => self.point_victory_enabled = expect_bool(field, value)?,
            "repetition_rule_enabled" => self.repetition_rule_enabled = expect_bool(field, value)?,
            "fifty_move_rule_enabled" => self.fifty_move_rule_enabled = expect_bool(field, value)?,
            "point_threshold" => {
                self.point_threshold = value
                    .as_u64()
                    .filter(|&n| n >= 1)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| GameError::InvalidConfig {
                        field: field.to_string(),
                        reason: "expected a positive integer".to_string(),
                    })?;
            }
            "harmony_recheck" => {
                self.harmony_recheck = match value.as_str() {
                    Some("exact") => HarmonyRecheck::ExactDeclaration,
                    Some("any") => HarmonyRecheck::AnyHarmony,
                    _ => {
                        return Err(GameError::InvalidConfig {
                            field: field.to_string(),
                            reason: "expected \"exact\" or \"any\"".to_string(),
                        });
                    }
                };
            }
            "harmony_spacing" => {
                self.harmony_spacing = match value.as_str() {
                    Some("adjacent") => SpacingRule::Adjacent,
                    Some("equal") => SpacingRule::EqualSpacing,
                    Some("collinear") => SpacingRule::CollinearOnly,
                    _ => {
                        return Err(GameError::InvalidConfig {
                            field: field.to_string(),
                            reason: "expected \"adjacent\", \"equal\" or \"collinear\"".to_string(),
                        });
                    }
                };
            }
            "time_control" => {
                self.time_control = if value.is_null() {
                    None
                } else {
                    Some(value.as_u64().ok_or_else(|| GameError::InvalidConfig {
                        field: field.to_string(),
                        reason: "expected null or a non-negative integer".to_string(),
                    })?)
                };
            }
            "white_seat" | "black_seat" => {
                let seat = if value.is_null() {
                    None
                } else {
                    Some(
                        value
                            .as_str()
                            .ok_or_else(|| GameError::InvalidConfig {
                                field: field.to_string(),
                                reason: "expected null or a string".to_string(),
                            })?
                            .to_string(),
                    )
                };
                if field == "white_seat" {
                    self.white_seat = seat;
                } else {
                    self.black_seat = seat;
                }
            }
            other => return Err(GameError::UnknownConfigField(other.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid capture: {0}")]
    InvalidCapture(String),
    #[error("Invalid ambush: {0}")]
    InvalidAmbush(String),
    #[error("Invalid harmony declaration: {0}")]
    InvalidHarmony(String),
    #[error("Invalid claim: {0}")]
    InvalidClaim(String),
    #[error("No piece with id {0}")]
    PieceNotFound(PieceId),
    #[error("Game already over")]
    GameOver,
    #[error("Action not allowed in the {0:?} phase")]
    WrongPhase(Phase),
    #[error("Unknown config field: {0}")]
    UnknownConfigField(String),
    #[error("Invalid value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl From<BoardError> for GameError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::PieceNotFound(id) => GameError::PieceNotFound(id),
            BoardError::BadSquare(s) => GameError::InvalidMove(format!("bad square: {}", s)),
        }
    }
}

/// A declared capture at the move's destination square.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDecl {
    pub relation: Relation,
    pub helper: Option<PieceId>,
}

/// A declared ambush: two friendly helpers against a second enemy piece,
/// independent of the primary move's destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbushDecl {
    pub target: PieceId,
    pub helpers: [PieceId; 2],
    pub relation: Relation,
}

/// The eleven accepted action kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    SetConfig {
        field: String,
        value: Value,
    },
    Reset,
    ReturnToSetup,
    Start,
    Move {
        piece: PieceId,
        from: Square,
        to: Square,
        face: Option<u32>,
        capture: Option<CaptureDecl>,
        ambush: Option<AmbushDecl>,
    },
    DeclareHarmony {
        pieces: [PieceId; 3],
        proportion: Proportion,
    },
    Resign,
    OfferDraw,
    AcceptDraw,
    ClaimRepetition,
    ClaimFiftyMoves,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinCondition {
    Harmony,
    Points,
    Exhaustion,
    Resignation,
    DrawAgreement,
    DrawRepetition,
    DrawFiftyMoves,
}

impl WinCondition {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            WinCondition::DrawAgreement
                | WinCondition::DrawRepetition
                | WinCondition::DrawFiftyMoves
        )
    }
}

/// A pending harmony claim. Lives from declaration until confirmed
/// (victory) or invalidated on the declarer's next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonyDeclaration {
    pub color: Color,
    pub pieces: [PieceId; 3],
    pub proportion: Proportion,
    pub values: [u32; 3],
    pub ply: u32,
}

/// The capture context actually used, kept for history and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub target: PieceId,
    pub relation: Relation,
    pub helper: Option<PieceId>,
    pub reason: String,
}

/// One immutable history entry. Non-spatial actions carry no from/to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub ply: u32,
    pub color: Color,
    pub from: Option<Square>,
    pub to: Option<Square>,
    pub piece: Option<PieceId>,
    pub capture: Option<CaptureRecord>,
    pub ambush: Option<AmbushDecl>,
    pub harmony: Option<HarmonyDeclaration>,
    pub hash: String,
    pub no_progress: u32,
    pub outcome: Option<WinCondition>,
}

/// The aggregate game state. Mutated exclusively through `Engine::apply`,
/// which always returns a fresh snapshot and never touches its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    phase: Phase,
    to_move: Color,
    board: Board,
    captured: [Vec<PieceId>; 2],
    points: [u32; 2],
    history: Vec<MoveRecord>,
    pending_harmony: Option<HarmonyDeclaration>,
    no_progress: u32,
    hashes: Vec<String>,
    winner: Option<Color>,
    win_condition: Option<WinCondition>,
    config: RulesConfig,
    ply: u32,
}

impl GameState {
    /// A fresh game in the setup phase with the traditional layout.
    pub fn new(config: RulesConfig) -> Self {
        GameState {
            phase: Phase::Setup,
            to_move: Color::White,
            board: initial_board(),
            captured: [Vec::new(), Vec::new()],
            points: [0, 0],
            history: Vec::new(),
            pending_harmony: None,
            no_progress: 0,
            hashes: Vec::new(),
            winner: None,
            win_condition: None,
            config,
            ply: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn to_move(&self) -> Color {
        self.to_move
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn win_condition(&self) -> Option<WinCondition> {
        self.win_condition
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::Results
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn hashes(&self) -> &[String] {
        &self.hashes
    }

    pub fn pending_harmony(&self) -> Option<&HarmonyDeclaration> {
        self.pending_harmony.as_ref()
    }

    pub fn no_progress(&self) -> u32 {
        self.no_progress
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn points(&self, color: Color) -> u32 {
        self.points[color.index()]
    }

    pub fn captured_by(&self, color: Color) -> &[PieceId] {
        &self.captured[color.index()]
    }

    /// Get a string representation of the board
    pub fn display_board(&self) -> String {
        let mut result = String::new();
        result.push_str("   ");
        for file in 0..BOARD_FILES {
            result.push_str(&format!(" {} ", (b'A' + file) as char));
        }
        result.push('\n');

        for rank in (0..BOARD_RANKS).rev() {
            result.push_str(&format!("{:2} ", rank + 1));
            for file in 0..BOARD_FILES {
                let c = match self.board.piece_at(Square::new(file, rank)) {
                    Some(piece) => {
                        let glyph = match piece.shape {
                            Shape::Round => 'r',
                            Shape::Triangle => 't',
                            Shape::Square => 's',
                            Shape::Pyramid => 'p',
                        };
                        if piece.color == Color::White {
                            glyph.to_ascii_uppercase()
                        } else {
                            glyph
                        }
                    }
                    None => '.',
                };
                result.push_str(&format!(" {} ", c));
            }
            result.push('\n');
        }

        result
    }

    fn current_hash(&self) -> String {
        self.hashes.last().cloned().unwrap_or_else(|| format_hash(0))
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new(RulesConfig::default())
    }
}

/// The rules engine. The Zobrist table and the path validator are built
/// once and shared read-only; `apply` is a pure (state, action) -> state
/// function with no other inputs.
pub struct Engine<P: PathValidator> {
    zobrist: Zobrist,
    paths: P,
}

impl<P: PathValidator> Engine<P> {
    pub fn new(zobrist: Zobrist, paths: P) -> Self {
        Engine { zobrist, paths }
    }

    /// Validate an action against a state and produce the resulting state.
    /// The input state is never mutated; on rejection it stands unchanged.
    pub fn apply(&self, state: &GameState, action: Action) -> Result<GameState, GameError> {
        match action {
            Action::SetConfig { field, value } => {
                let mut next = state.clone();
                next.config.apply(&field, &value)?;
                Ok(next)
            }
            Action::Reset => Ok(self.fresh_game(state.config.clone(), Phase::Playing)),
            Action::ReturnToSetup => Ok(self.fresh_game(state.config.clone(), Phase::Setup)),
            Action::Start => {
                if state.phase != Phase::Setup {
                    return Err(GameError::WrongPhase(state.phase));
                }
                let mut next = state.clone();
                next.phase = Phase::Playing;
                next.hashes
                    .push(format_hash(self.zobrist.hash(&next.board, next.to_move)));
                Ok(next)
            }
            _ if state.phase == Phase::Results => Err(GameError::GameOver),
            _ if state.phase == Phase::Setup => Err(GameError::WrongPhase(state.phase)),
            Action::Move {
                piece,
                from,
                to,
                face,
                capture,
                ambush,
            } => self.apply_move(state, piece, from, to, face, capture, ambush),
            Action::DeclareHarmony { pieces, proportion } => {
                self.apply_declare(state, pieces, proportion)
            }
            Action::Resign => {
                let mut next = state.clone();
                let winner = next.to_move.opponent();
                self.push_plain_record(&mut next);
                Self::finish(&mut next, Some(winner), WinCondition::Resignation);
                Ok(next)
            }
            Action::OfferDraw => {
                // Offers are untracked; the record is kept for the audit
                // trail and acceptance is unconditional.
                let mut next = state.clone();
                self.push_plain_record(&mut next);
                Ok(next)
            }
            Action::AcceptDraw => {
                let mut next = state.clone();
                self.push_plain_record(&mut next);
                Self::finish(&mut next, None, WinCondition::DrawAgreement);
                Ok(next)
            }
            Action::ClaimRepetition => {
                if !state.config.repetition_rule_enabled {
                    return Err(GameError::InvalidClaim(
                        "the repetition rule is disabled".to_string(),
                    ));
                }
                if !is_threefold(&state.hashes) {
                    return Err(GameError::InvalidClaim(
                        "the position has not occurred three times".to_string(),
                    ));
                }
                let mut next = state.clone();
                self.push_plain_record(&mut next);
                Self::finish(&mut next, None, WinCondition::DrawRepetition);
                Ok(next)
            }
            Action::ClaimFiftyMoves => {
                if !state.config.fifty_move_rule_enabled {
                    return Err(GameError::InvalidClaim(
                        "the fifty-move rule is disabled".to_string(),
                    ));
                }
                if state.no_progress < FIFTY_MOVE_LIMIT {
                    return Err(GameError::InvalidClaim(format!(
                        "only {} moves without progress",
                        state.no_progress
                    )));
                }
                let mut next = state.clone();
                self.push_plain_record(&mut next);
                Self::finish(&mut next, None, WinCondition::DrawFiftyMoves);
                Ok(next)
            }
        }
    }

    fn fresh_game(&self, config: RulesConfig, phase: Phase) -> GameState {
        let mut state = GameState::new(config);
        if phase == Phase::Playing {
            state.phase = Phase::Playing;
            state
                .hashes
                .push(format_hash(self.zobrist.hash(&state.board, state.to_move)));
        }
        state
    }

    /// History entry for a non-spatial action (resign, draw events, claims).
    fn push_plain_record(&self, next: &mut GameState) {
        let record = MoveRecord {
            ply: next.ply,
            color: next.to_move,
            from: None,
            to: None,
            piece: None,
            capture: None,
            ambush: None,
            harmony: None,
            hash: next.current_hash(),
            no_progress: next.no_progress,
            outcome: None,
        };
        next.history.push(record);
    }

    fn finish(next: &mut GameState, winner: Option<Color>, condition: WinCondition) {
        next.winner = winner;
        next.win_condition = Some(condition);
        next.phase = Phase::Results;
        if let Some(record) = next.history.last_mut() {
            record.outcome = Some(condition);
        }
    }

    fn apply_move(
        &self,
        state: &GameState,
        piece_id: PieceId,
        from: Square,
        to: Square,
        face: Option<u32>,
        capture: Option<CaptureDecl>,
        ambush: Option<AmbushDecl>,
    ) -> Result<GameState, GameError> {
        let mut next = state.clone();

        // 1. Resolve the mover.
        let mover = next.board.piece(piece_id)?.clone();
        if mover.color != next.to_move {
            return Err(GameError::InvalidMove(format!(
                "it is {}'s turn",
                next.to_move
            )));
        }
        if mover.captured {
            return Err(GameError::InvalidMove(format!(
                "piece {} has been captured",
                piece_id
            )));
        }
        if mover.square != Some(from) {
            return Err(GameError::InvalidMove(format!(
                "piece {} is not on {}",
                piece_id, from
            )));
        }

        // 2. Shape-specific geometry is the path validator's call.
        self.paths
            .validate_path(&mover, from, to, &next.board)
            .map_err(GameError::InvalidMove)?;

        // A declared face must name one of the pyramid's candidate values,
        // whether or not this move captures.
        if let Some(f) = face {
            if mover.shape != Shape::Pyramid {
                return Err(GameError::InvalidMove(
                    "only pyramids have face values".to_string(),
                ));
            }
            if !mover.has_face(f) {
                return Err(GameError::InvalidCapture(format!(
                    "{} is not one of the pyramid's faces",
                    f
                )));
            }
        }

        // 3-5. Destination occupancy decides plain move vs. capture.
        let occupant = next.board.piece_at(to).map(|p| (p.id, p.color));
        let capture_record = match occupant {
            None => {
                if capture.is_some() {
                    return Err(GameError::InvalidCapture(
                        "destination square is empty".to_string(),
                    ));
                }
                None
            }
            Some((_, color)) if color == mover.color => {
                return Err(GameError::InvalidMove(
                    "cannot capture a friendly piece".to_string(),
                ));
            }
            Some((target_id, _)) => {
                let decl = capture.ok_or_else(|| {
                    GameError::InvalidCapture(
                        "destination is occupied; a capture declaration is required".to_string(),
                    )
                })?;
                Some(self.validate_capture(&next.board, &mover, face, target_id, &decl)?)
            }
        };

        // 6. Apply: relocate, update face, execute the primary capture.
        {
            let piece = next.board.piece_mut(piece_id)?;
            piece.square = Some(to);
            if let Some(f) = face {
                piece.active_face = Some(f);
            }
        }
        let mut any_capture = false;
        if let Some(record) = &capture_record {
            Self::capture_piece(&mut next, record.target, mover.color)?;
            any_capture = true;
        }

        // 7. Ambush: validated against the post-capture board.
        let ambush_record = match ambush {
            Some(decl) => {
                self.validate_ambush(&next.board, mover.color, &decl)?;
                Self::capture_piece(&mut next, decl.target, mover.color)?;
                any_capture = true;
                Some(decl)
            }
            None => None,
        };

        next.no_progress = if any_capture { 0 } else { next.no_progress + 1 };
        next.ply += 1;

        // 8-9. Hash the new position for the new side to move.
        next.to_move = mover.color.opponent();
        let hash = format_hash(self.zobrist.hash(&next.board, next.to_move));
        next.hashes.push(hash.clone());
        next.history.push(MoveRecord {
            ply: next.ply,
            color: mover.color,
            from: Some(from),
            to: Some(to),
            piece: Some(piece_id),
            capture: capture_record,
            ambush: ambush_record,
            harmony: None,
            hash,
            no_progress: next.no_progress,
            outcome: None,
        });

        // 10-12. Victory resolution in fixed order; first match wins.
        self.resolve_victory(&mut next);

        Ok(next)
    }

    fn validate_capture(
        &self,
        board: &Board,
        mover: &Piece,
        face: Option<u32>,
        target_id: PieceId,
        decl: &CaptureDecl,
    ) -> Result<CaptureRecord, GameError> {
        let mover_value = if mover.shape == Shape::Pyramid {
            face.ok_or_else(|| {
                GameError::InvalidCapture(
                    "a pyramid must declare a face value to capture".to_string(),
                )
            })?
        } else {
            mover
                .effective_value()
                .expect("non-pyramid pieces always carry a value")
        };

        let target = board.piece(target_id)?;
        let target_value = target.effective_value().ok_or_else(|| {
            GameError::InvalidCapture(format!("target {} has no effective value", target_id))
        })?;

        let helper_value = match decl.helper {
            Some(helper_id) => {
                let helper = board.piece(helper_id)?;
                if helper.color != mover.color {
                    return Err(GameError::InvalidCapture(
                        "helper must be a friendly piece".to_string(),
                    ));
                }
                if !helper.is_live() {
                    return Err(GameError::InvalidCapture(
                        "helper has been captured".to_string(),
                    ));
                }
                if helper_id == mover.id {
                    return Err(GameError::InvalidCapture(
                        "helper must be distinct from the mover".to_string(),
                    ));
                }
                if helper.shape == Shape::Pyramid {
                    return Err(GameError::InvalidCapture(
                        "pyramids cannot serve as helpers".to_string(),
                    ));
                }
                helper.effective_value()
            }
            None => None,
        };

        let check = relation::check(decl.relation, mover_value, target_value, helper_value);
        if !check.holds {
            return Err(GameError::InvalidCapture(check.reason));
        }
        Ok(CaptureRecord {
            target: target_id,
            relation: decl.relation,
            helper: decl.helper,
            reason: check.reason,
        })
    }

    /// Ambush: the relation constrains the two helpers and the victim only;
    /// the primary mover plays no part. Helper one fills the mover slot,
    /// helper two the helper slot.
    fn validate_ambush(
        &self,
        board: &Board,
        by: Color,
        decl: &AmbushDecl,
    ) -> Result<(), GameError> {
        let [first_id, second_id] = decl.helpers;
        if first_id == second_id {
            return Err(GameError::InvalidAmbush(
                "ambush helpers must be distinct pieces".to_string(),
            ));
        }

        let victim = board.piece(decl.target)?;
        if victim.color == by {
            return Err(GameError::InvalidAmbush(
                "cannot ambush a friendly piece".to_string(),
            ));
        }
        if !victim.is_live() {
            return Err(GameError::InvalidAmbush(
                "ambush target is not on the board".to_string(),
            ));
        }
        let victim_value = victim.effective_value().ok_or_else(|| {
            GameError::InvalidAmbush(format!("target {} has no effective value", decl.target))
        })?;

        let mut helper_values = [0u32; 2];
        for (value, id) in helper_values.iter_mut().zip([first_id, second_id]) {
            let helper = board.piece(id)?;
            if helper.color != by {
                return Err(GameError::InvalidAmbush(
                    "ambush helpers must be friendly pieces".to_string(),
                ));
            }
            if !helper.is_live() {
                return Err(GameError::InvalidAmbush(format!(
                    "helper {} has been captured",
                    id
                )));
            }
            if helper.shape == Shape::Pyramid {
                return Err(GameError::InvalidAmbush(
                    "pyramids cannot serve as helpers".to_string(),
                ));
            }
            *value = helper
                .effective_value()
                .expect("non-pyramid pieces always carry a value");
        }

        let check = relation::check(
            decl.relation,
            helper_values[0],
            victim_value,
            Some(helper_values[1]),
        );
        if !check.holds {
            return Err(GameError::InvalidAmbush(check.reason));
        }
        Ok(())
    }

    fn capture_piece(next: &mut GameState, target_id: PieceId, by: Color) -> Result<(), GameError> {
        let target = next.board.piece_mut(target_id)?;
        target.captured = true;
        target.square = None;
        let points = target.shape.capture_points();
        next.captured[by.index()].push(target_id);
        next.points[by.index()] += points;
        Ok(())
    }

    /// Steps 10-12 of move processing: pending harmony, then points, then
    /// exhaustion. The first condition that fires decides the game.
    fn resolve_victory(&self, next: &mut GameState) {
        // 10. A pending harmony is judged when the turn comes back to the
        // declarer: it must have survived one full opponent turn.
        if let Some(decl) = next.pending_harmony.clone() {
            if next.to_move == decl.color {
                let confirmed = match next.config.harmony_recheck {
                    HarmonyRecheck::ExactDeclaration => harmony::revalidate(
                        &next.board,
                        decl.color,
                        &decl.pieces,
                        next.config.harmony_spacing,
                    ),
                    HarmonyRecheck::AnyHarmony => {
                        harmony::exists(&next.board, decl.color, next.config.harmony_spacing)
                    }
                };
                if confirmed {
                    Self::finish(next, Some(decl.color), WinCondition::Harmony);
                    return;
                }
                next.pending_harmony = None;
            }
        }

        // 11. Points victory for the side that just moved.
        let moved = next.to_move.opponent();
        if next.config.point_victory_enabled
            && next.points[moved.index()] >= next.config.point_threshold
        {
            Self::finish(next, Some(moved), WinCondition::Points);
            return;
        }

        // 12. Exhaustion: the new side to move has no legal move anywhere.
        if !self.has_any_legal_move(&next.board, next.to_move) {
            Self::finish(next, Some(moved), WinCondition::Exhaustion);
        }
    }

    fn apply_declare(
        &self,
        state: &GameState,
        pieces: [PieceId; 3],
        proportion: Proportion,
    ) -> Result<GameState, GameError> {
        let mut next = state.clone();
        let color = next.to_move;

        let detected = harmony::detect(&next.board, color, &pieces, next.config.harmony_spacing)
            .map_err(|e| GameError::InvalidHarmony(e.to_string()))?;
        if detected.proportion != proportion {
            return Err(GameError::InvalidHarmony(format!(
                "claimed a {} proportion but the pieces form a {} one",
                proportion, detected.proportion
            )));
        }

        let declaration = HarmonyDeclaration {
            color,
            pieces: detected.pieces,
            proportion: detected.proportion,
            values: detected.values,
            ply: next.ply,
        };
        next.pending_harmony = Some(declaration.clone());
        next.history.push(MoveRecord {
            ply: next.ply,
            color,
            from: None,
            to: None,
            piece: None,
            capture: None,
            ambush: None,
            harmony: Some(declaration),
            hash: next.current_hash(),
            no_progress: next.no_progress,
            outcome: None,
        });
        Ok(next)
    }

    /// Brute-force exhaustion check: every live piece against every square.
    /// Capture destinations count only under the helper-free relations;
    /// helper-assisted captures are deliberately not searched, so a position
    /// whose only captures need helpers is judged exhausted.
    pub fn has_any_legal_move(&self, board: &Board, color: Color) -> bool {
        for piece in board.live_pieces(color) {
            let from = piece.square.expect("live piece has a square");
            for rank in 0..BOARD_RANKS {
                for file in 0..BOARD_FILES {
                    let to = Square::new(file, rank);
                    if to == from {
                        continue;
                    }
                    if self.paths.validate_path(piece, from, to, board).is_err() {
                        continue;
                    }
                    match board.piece_at(to) {
                        None => return true,
                        Some(other) if other.color == color => {}
                        Some(enemy) => {
                            let (Some(mover_value), Some(target_value)) =
                                (piece.effective_value(), enemy.effective_value())
                            else {
                                continue;
                            };
                            if relation::equal(mover_value, target_value).holds
                                || relation::multiple(mover_value, target_value).holds
                                || relation::divisor(mover_value, target_value).holds
                            {
                                return true;
                            }
                        }
                    }
                }
            }
        }
        false
    }
}
