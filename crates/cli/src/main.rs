use satstack_core::{
    Event, GameSession, Identity, MatchRules, ParticipantId, SessionStatus, TurnPhase,
};
use serde::Serialize;
use std::collections::BTreeMap;

const DEFAULT_RUN_SEED: u64 = 0xC0FFEE;
const HUMAN_SEAT: ParticipantId = ParticipantId(1);

#[derive(Debug, Clone)]
struct CliOptions {
    opponents: Vec<Identity>,
    seed: u64,
    games: u32,
    // The scripted human banks once the turn pot reaches this.
    bank_at: u32,
    limitless: bool,
    json: bool,
}

fn parse_cli_options(args: &[String]) -> Result<CliOptions, String> {
    let mut opponents = Vec::new();
    let mut seed = DEFAULT_RUN_SEED;
    let mut games = 1u32;
    let mut bank_at = 21u32;
    let mut limitless = false;
    let mut json = false;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--seed" => {
                let value = args.get(idx + 1).ok_or("--seed needs a value")?;
                seed = value.parse::<u64>().map_err(|err| err.to_string())?;
                idx += 1;
            }
            "--games" => {
                let value = args.get(idx + 1).ok_or("--games needs a value")?;
                games = value.parse::<u32>().map_err(|err| err.to_string())?;
                idx += 1;
            }
            "--bank-at" => {
                let value = args.get(idx + 1).ok_or("--bank-at needs a value")?;
                bank_at = value.parse::<u32>().map_err(|err| err.to_string())?;
                idx += 1;
            }
            "--limitless" => limitless = true,
            "--json" => json = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{other}'"));
            }
            other => opponents.push(other.parse::<Identity>().map_err(|err| err.to_string())?),
        }
        idx += 1;
    }
    if opponents.is_empty() {
        opponents.push(Identity::Sandy);
    }
    Ok(CliOptions {
        opponents,
        seed,
        games,
        bank_at,
        limitless,
        json,
    })
}

#[derive(Debug, Serialize)]
struct SeatReport {
    name: String,
    total: u32,
}

#[derive(Debug, Serialize)]
struct GameReport {
    game: u32,
    seed: u64,
    round: u32,
    winner: Option<String>,
    seats: Vec<SeatReport>,
}

fn format_event(event: &Event) -> String {
    match event {
        Event::SessionStarted {
            participants,
            winning_score,
            max_rounds,
        } => format!(
            "session started: {participants} seats, first to {winning_score}, rounds {}",
            max_rounds.map_or("unlimited".to_string(), |value| value.to_string())
        ),
        Event::TurnStarted {
            participant,
            round,
            declared_target,
        } => match declared_target {
            Some(target) => {
                format!("turn started: seat {} round {round} (aiming for {target})", participant.0)
            }
            None => format!("turn started: seat {} round {round}", participant.0),
        },
        Event::CardDrawn { participant, card } => {
            format!("card drawn: seat {} {} ({})", participant.0, card.name, card.value)
        }
        Event::DoubleUpArmed { participant } => {
            format!("double-up armed: seat {}", participant.0)
        }
        Event::DieRolled {
            participant,
            profile,
            face,
            turn_score,
        } => format!(
            "die rolled: seat {} {profile:?} face {face} pot {turn_score}",
            participant.0
        ),
        Event::BearishDodged { participant, card } => {
            format!("bear dodged: seat {} {}", participant.0, card.name)
        }
        Event::PenaltyApplied {
            participant,
            kind,
            total_score,
        } => format!(
            "penalty applied: seat {} {kind:?} total {total_score}",
            participant.0
        ),
        Event::Busted {
            participant,
            forfeited,
        } => format!("busted: seat {} forfeited {forfeited}", participant.0),
        Event::DecisionMade {
            participant,
            pushed,
            probability,
        } => format!(
            "decision: seat {} {} (p={probability:.3})",
            participant.0,
            if *pushed { "push" } else { "bank" }
        ),
        Event::Banked {
            participant,
            amount,
            total_score,
        } => format!(
            "banked: seat {} +{amount} total {total_score}",
            participant.0
        ),
        Event::TurnForced {
            participant,
            forfeited,
        } => format!("turn forced: seat {} forfeited {forfeited}", participant.0),
        Event::RoundAdvanced { round } => format!("round advanced: {round}"),
        Event::Finished { winner } => match winner {
            Some(id) => format!("finished: winner seat {}", id.0),
            None => "finished: draw".to_string(),
        },
    }
}

fn report_events(session: &mut GameSession, json: bool) {
    for event in session.drain_events() {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("log error: {err}"),
            }
        } else {
            println!("event: {}", format_event(&event));
        }
    }
}

fn play_game(options: &CliOptions, game: u32) -> Result<GameReport, String> {
    let seed = options.seed.wrapping_add(u64::from(game));
    let mut rules = match options.opponents.as_slice() {
        [single] => MatchRules::for_identity(*single),
        _ => MatchRules::default(),
    };
    rules.round_limitless = options.limitless;
    let mut session = GameSession::new(rules, seed);
    session
        .add_human(HUMAN_SEAT, "you")
        .map_err(|err| err.to_string())?;
    for (offset, identity) in options.opponents.iter().enumerate() {
        let id = ParticipantId(HUMAN_SEAT.0 + 1 + offset as u64);
        session.add_ai(id, *identity).map_err(|err| err.to_string())?;
    }
    session.start().map_err(|err| err.to_string())?;
    report_events(&mut session, options.json);

    while session.status() == SessionStatus::Playing {
        match session.turn().map(|turn| turn.phase) {
            Some(TurnPhase::AwaitingDraw) => {
                session
                    .draw_card(HUMAN_SEAT)
                    .map_err(|err| err.to_string())?;
            }
            Some(TurnPhase::AwaitingRoll) => {
                session
                    .roll_die(HUMAN_SEAT)
                    .map_err(|err| err.to_string())?;
            }
            Some(TurnPhase::ContinueDecision) => {
                let settled = session
                    .turn()
                    .map(|turn| turn.turn_score >= options.bank_at)
                    .unwrap_or(true);
                session
                    .choose(HUMAN_SEAT, !settled)
                    .map_err(|err| err.to_string())?;
            }
            _ => break,
        }
        report_events(&mut session, options.json);
    }
    report_events(&mut session, options.json);

    let winner = session.winner().and_then(|id| {
        session
            .participants()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.display_name.clone())
    });
    let seats = session
        .participants()
        .iter()
        .map(|p| SeatReport {
            name: p.display_name.clone(),
            total: p.total_score,
        })
        .collect();
    Ok(GameReport {
        game,
        seed,
        round: session.round(),
        winner,
        seats,
    })
}

fn print_report(report: &GameReport) {
    let winner = report.winner.as_deref().unwrap_or("nobody (draw)");
    println!(
        "game {}: seed={} round={} winner={}",
        report.game, report.seed, report.round, winner
    );
    for seat in &report.seats {
        println!("  {}: {}", seat.name, seat.total);
    }
}

fn print_usage() {
    println!(
        "usage: satstack-cli [identity ..] [--seed N] [--games N] [--bank-at N] [--limitless] [--json]"
    );
    println!("the human seat is scripted: it draws, rolls, and banks at --bank-at (default 21)");
    println!("identities (default sandy):");
    for identity in Identity::ALL {
        println!(
            "  {:8} {:12} {}",
            identity.key(),
            identity.difficulty(),
            identity.blurb()
        );
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return;
    }
    let options = match parse_cli_options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("argument error: {err}");
            print_usage();
            std::process::exit(2);
        }
    };
    let mut wins: BTreeMap<String, u32> = BTreeMap::new();
    for game in 0..options.games {
        let report = match play_game(&options, game) {
            Ok(report) => report,
            Err(err) => {
                eprintln!("game {game} error: {err}");
                std::process::exit(1);
            }
        };
        if options.json {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("log error: {err}"),
            }
        } else {
            print_report(&report);
        }
        let tally = report.winner.unwrap_or_else(|| "draw".to_string());
        *wins.entry(tally).or_insert(0) += 1;
    }
    if !options.json && options.games > 1 {
        println!("wins over {} games:", options.games);
        for (name, count) in &wins {
            println!("  {name}: {count}");
        }
    }
}
