use rithmomachia::*;

fn main() {
    println!("Rithmomachia - The Philosophers' Game");
    println!("=====================================\n");

    let engine = Engine::new(Zobrist::default(), ClassicalPaths);
    let mut state = GameState::new(RulesConfig::default());

    state = match engine.apply(&state, Action::Start) {
        Ok(next) => next,
        Err(e) => {
            eprintln!("could not start the game: {}", e);
            return;
        }
    };
    println!("Initial position:");
    println!("{}", state.display_board());

    // A short opening: both sides develop rounds, then White's triangle of
    // value 42 takes the black round of value 3 by MULTIPLE (42 = 14 x 3).
    let script = [
        plain_move(19, "G3", "F4"),
        plain_move(26, "E6", "F5"),
        plain_move(19, "F4", "E5"),
        plain_move(26, "F5", "G4"),
        Action::Move {
            piece: 11,
            from: "G2".parse().unwrap(),
            to: "G4".parse().unwrap(),
            face: None,
            capture: Some(CaptureDecl {
                relation: Relation::Multiple,
                helper: None,
            }),
            ambush: None,
        },
    ];

    for action in script {
        state = match engine.apply(&state, action) {
            Ok(next) => next,
            Err(e) => {
                eprintln!("move rejected: {}", e);
                return;
            }
        };
    }

    println!("After {} plies:", state.ply());
    println!("{}", state.display_board());
    println!(
        "Points: White {} - Black {}",
        state.points(Color::White),
        state.points(Color::Black)
    );

    if let Some(record) = state.history().last() {
        if let Ok(json) = serde_json::to_string_pretty(record) {
            println!("\nLast move record:");
            println!("{}", json);
        }
    }
    if let Some(hash) = state.hashes().last() {
        println!("\nPosition hash: {}", hash);
    }
}

fn plain_move(piece: PieceId, from: &str, to: &str) -> Action {
    Action::Move {
        piece,
        from: from.parse().unwrap(),
        to: to.parse().unwrap(),
        face: None,
        capture: None,
        ambush: None,
    }
}
