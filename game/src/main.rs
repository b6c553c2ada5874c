// game/src/main.rs
mod engine;

use crate::engine::Engine;
use engine_core::game::game::Game;
use engine_core::logging::logging::init_logger;
use engine_core::storage::engine_config::{load_config, load_config_from};
use engine_core::*;
use std::env;
use std::path::PathBuf;
use std::process;

/// Command line of the play-test binary.
#[derive(Debug, Default, PartialEq)]
struct Args {
    scene: Option<PathBuf>,
    config: Option<PathBuf>,
    save: Option<PathBuf>,
    ticks: Option<u32>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(args.next().ok_or("--config needs a path")?.into()),
            "--save" => parsed.save = Some(args.next().ok_or("--save needs a path")?.into()),
            "--ticks" => {
                let value = args.next().ok_or("--ticks needs a number")?;
                let ticks = value.parse().map_err(|_| format!("invalid tick count `{value}`"))?;
                parsed.ticks = Some(ticks);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option `{flag}`")),
            _ if parsed.scene.is_none() => parsed.scene = Some(PathBuf::from(&arg)),
            _ => return Err(format!("unexpected argument `{arg}`")),
        }
    }
    Ok(parsed)
}

fn main() {
    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "playtest".to_string());

    let args = match parse_args(argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Usage: {program} [scene.json] [--config engine_config.ron] [--ticks N] [--save out.scene.json]");
            process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };

    // Keep the handle alive so buffered log lines get flushed on exit.
    let _logger = match init_logger(&config) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Could not start the logger: {e}");
            None
        }
    };

    let mut game = Game::from_config(&config);
    let textures = game.assets.load_folder();
    log::info!(
        "{} component types registered, {textures} textures loaded.",
        game.registry.len()
    );

    let Some(scene) = args.scene.or(config.startup_scene.clone()) else {
        onscreen_error!("No scene given and no startup scene configured.");
        process::exit(1);
    };
    if game.load_scene(&scene).is_err() {
        process::exit(1);
    }

    let mut engine = Engine::new(game);
    let summary = engine.run(args.ticks.unwrap_or(config.max_ticks));
    onscreen_info!(
        "Ran {} frames ({} steps, {} draw calls, {} failed updates, {} failed draws).",
        summary.frames,
        summary.steps,
        summary.draw_calls,
        summary.failed_updates,
        summary.failed_draws
    );

    if let Some(out) = args.save {
        if engine.game.save_scene(&out).is_err() {
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let args = parse(&["level.scene.json", "--ticks", "30", "--save", "out.scene.json"]).unwrap();
        assert_eq!(
            args,
            Args {
                scene: Some("level.scene.json".into()),
                config: None,
                save: Some("out.scene.json".into()),
                ticks: Some(30),
            }
        );
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(parse(&["--ticks", "many"]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["a.scene.json", "b.scene.json"]).is_err());
        assert!(parse(&["--fast"]).is_err());
    }
}
