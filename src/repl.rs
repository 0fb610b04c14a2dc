use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use earstreak::{ChordMatchGame, GameMode, GamePhase, GameSession, LevelConfiguration, Note};
use earstreak::{Progress, Settings, SoundService};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Line-driven melody game on stdin/stdout.
pub fn run_game(
    mode: GameMode,
    settings: Settings,
    sound: Arc<dyn SoundService>,
    progress: Progress,
    seed: u64,
) -> io::Result<()> {
    let mut session = GameSession::with_seed(mode, settings, sound, progress, seed);
    let mut out = io::stdout();

    print_game_help(&mut out)?;
    print_round(&mut out, &session)?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let argument = words.next();

        match command {
            "listen" | "l" => {
                session.play_target_melody();
                follow_melody(&mut out, &mut session)?;
            }
            "start" | "s" => {
                if !session.start_playing() {
                    writeln!(out, "Listen to the melody first.")?;
                }
            }
            "pick" | "p" => match argument.map(str::parse::<Note>) {
                Some(Ok(note)) => {
                    session.select_note(note);
                    if session.selected_note() != Some(note) {
                        writeln!(out, "{} is not available now.", note)?;
                    }
                }
                Some(Err(e)) => writeln!(out, "{}", e)?,
                None => writeln!(out, "usage: pick <note>")?,
            },
            "put" => match argument.and_then(|a| a.parse::<usize>().ok()) {
                Some(slot) if slot >= 1 => session.place_selected_note(slot - 1),
                _ => writeln!(out, "usage: put <slot number>")?,
            },
            "submit" | "check" => match session.check_answer() {
                Some(true) => writeln!(out, "Correct! Streak {}", session.correct_streak())?,
                Some(false) => writeln!(out, "Not quite. Streak reset.")?,
                None => writeln!(out, "Fill every slot while playing first.")?,
            },
            "replay" | "r" => {
                session.play_user_melody();
                follow_melody(&mut out, &mut session)?;
            }
            "stop" => session.stop_playback(),
            "next" | "n" => session.next_level(),
            "levels" => print_levels(&mut out, session.progress())?,
            "help" | "?" => print_game_help(&mut out)?,
            "quit" | "q" | "exit" => break,
            other => writeln!(out, "Unknown command '{}'; try help.", other)?,
        }
        print_round(&mut out, &session)?;
    }

    session.stop_playback();
    Ok(())
}

/// Chord naming quiz on stdin/stdout.
pub fn run_chords(sound: Arc<dyn SoundService>, settings: &Settings, seed: u64) -> io::Result<()> {
    let mut game = ChordMatchGame::with_seed(sound.clone(), settings, seed);
    let mut out = io::stdout();

    writeln!(out, "Commands: play, hear <n>, answer <n>, new, quit")?;
    game.start_new_round();
    game.play_current_chord();
    print_options(&mut out, &game)?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let option = words
            .next()
            .and_then(|a| a.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| game.options().get(i).copied());

        match (command, option) {
            ("play", _) => game.play_current_chord(),
            ("hear", Some(chord)) => game.play_option(&chord),
            ("answer", Some(chord)) => match game.select_chord(&chord) {
                Some(correct) => {
                    let answer = game.current_chord().map(|c| c.display_name()).unwrap_or_default();
                    let verdict = if correct { "Correct" } else { "Wrong" };
                    writeln!(out, "{}: it was {}. Score {}", verdict, answer, game.score())?;
                }
                None => writeln!(out, "Already answered; type new.")?,
            },
            ("new", _) => {
                game.start_new_round();
                game.play_current_chord();
                print_options(&mut out, &game)?;
            }
            ("quit" | "q" | "exit", _) => break,
            _ => writeln!(out, "Commands: play, hear <n>, answer <n>, new, quit")?,
        }
    }

    sound.stop_all();
    Ok(())
}

fn follow_melody(out: &mut impl Write, session: &mut GameSession) -> io::Result<()> {
    let mut shown = None;
    loop {
        let status = session.sync_playback();
        if status.now_playing != shown {
            if let Some(index) = status.now_playing {
                write!(out, " {}", index + 1)?;
                out.flush()?;
            }
            shown = status.now_playing;
        }
        if !status.is_melody_playing {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    writeln!(out)
}

fn print_round(out: &mut impl Write, session: &GameSession) -> io::Result<()> {
    let configuration = session.configuration();
    let title = if configuration.is_challenge() {
        "Challenge".to_string()
    } else {
        format!("Level {}", configuration.level_number)
    };

    let slots: Vec<String> = session
        .answer()
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let label = slot.map(|n| n.to_string()).unwrap_or_else(|| "_".into());
            match session.feedback().get(i) {
                Some(true) => format!("{}+", label),
                Some(false) => format!("{}x", label),
                None => label,
            }
        })
        .collect();
    let notes: Vec<&str> = session.available_notes().iter().map(|n| n.label()).collect();

    writeln!(
        out,
        "[{}] {:?} | streak {} | notes {} | answer {}",
        title,
        session.phase(),
        session.correct_streak(),
        notes.join(" "),
        slots.join(" ")
    )?;
    if session.is_challenge() {
        writeln!(out, "Best streak {}", session.challenge_best_streak())?;
    }
    if session.phase() == GamePhase::LevelComplete {
        writeln!(out, "Level complete!")?;
    }
    Ok(())
}

fn print_levels(out: &mut impl Write, progress: &Progress) -> io::Result<()> {
    let unlocked = progress.unlocked_levels();
    for level in LevelConfiguration::catalog() {
        let mark = if unlocked.contains(&level.level_number) { " " } else { "#" };
        writeln!(
            out,
            "{} {:>2}: {} notes, melody of {}",
            mark, level.level_number, level.grid_size, level.melody_length
        )?;
    }
    Ok(())
}

fn print_options(out: &mut impl Write, game: &ChordMatchGame) -> io::Result<()> {
    for (i, chord) in game.options().iter().enumerate() {
        writeln!(out, "  {}: {}", i + 1, chord.display_name())?;
    }
    Ok(())
}

fn print_game_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "Commands: listen, start, pick <note>, put <slot>, submit, replay, stop, next, levels, quit"
    )
}
