use std::fs;
use std::process::ExitCode;

use clap::Parser;
use image::Rgba;
use rasterpad::cli::{self, CliArgs};
use rasterpad::script::{self, Op};
use rasterpad::{CanvasSession, PaintConfig, ScriptError, io};

fn quiet_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("rasterpad.toml");
    let log = dir.join("session.log");
    fs::write(
        &path,
        format!(
            "[canvas]\nwidth = 16\nheight = 12\n\n[render]\nmax_fps = 0\n\n[logging]\nlevel = \"debug\"\nfile = {:?}\n",
            log.to_string_lossy()
        ),
    )
    .unwrap();
    path
}

#[test]
fn script_replays_into_session() {
    let ops = script::parse_script(
        "tool rect\n\
         color primary red\n\
         stroke 1 1 6 6\n\
         tool pencil\n\
         press 0 11\n\
         drag 15 11\n\
         release 15 11\n\
         undo\n\
         redo\n\
         tool fill\n\
         color primary blue\n\
         press 3 3\n\
         release 3 3\n",
    )
    .unwrap();

    let mut config = PaintConfig::default();
    config.canvas.width = 16;
    config.canvas.height = 12;
    let mut session = CanvasSession::new(&config).unwrap();
    let stats = script::replay(&mut session, &ops);

    assert_eq!(stats.ops, ops.len());
    assert_eq!((stats.undos, stats.redos), (1, 1));
    assert_eq!(session.history().undo_count(), 3);
    let grid = session.grid();
    assert_eq!(grid.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
    assert_eq!(grid.get_pixel(3, 3), Rgba([0, 0, 255, 255]));
    assert_eq!(grid.get_pixel(8, 11), Rgba([0, 0, 0, 255]));
    assert_eq!(session.display().pixel(3, 3), Some([255, 0, 0, 255]));
}

#[test]
fn unfinished_press_is_released_at_end() {
    let ops = script::parse_script("press 2 2\ndrag 5 2").unwrap();
    let mut session = CanvasSession::new(&PaintConfig::default()).unwrap();
    script::replay(&mut session, &ops);
    assert!(!session.is_session_active());
    assert_eq!(session.history().undo_description().as_deref(), Some("pencil (4 px)"));
}

#[test]
fn parse_errors_name_the_line() {
    let err = script::parse_script("tool pencil\npress 1 1\nsmear 2 2\n").unwrap_err();
    assert_eq!(err, ScriptError::UnknownOp { line: 3, op: "smear".into() });
    assert_eq!(err.to_string(), "line 3: unknown operation `smear`");
    assert!(matches!(script::parse_script("press 1 1").unwrap().as_slice(), [Op::Press(1, 1)]));
}

#[test]
fn cli_writes_png_from_script() {
    let dir = tempfile::tempdir().unwrap();
    let config = quiet_config(dir.path());
    let ops = dir.path().join("ops.txt");
    fs::write(&ops, "# border\ntool rectangle\nstroke 0 0 15 11\n").unwrap();
    let out = dir.path().join("out.png");

    let args = CliArgs::parse_from([
        "rasterpad",
        "--config",
        config.to_str().unwrap(),
        "--ops",
        ops.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);
    assert_eq!(cli::run(args), ExitCode::SUCCESS);

    let grid = io::load_grid(&out).unwrap();
    assert_eq!((grid.width(), grid.height()), (16, 12));
    assert_eq!(grid.get_pixel(15, 0), Rgba([0, 0, 0, 255]));
    assert_eq!(grid.get_pixel(7, 6), Rgba([255, 255, 255, 255]));
}

#[test]
fn cli_loads_input_and_fails_on_bad_script() {
    let dir = tempfile::tempdir().unwrap();
    let config = quiet_config(dir.path());
    let input = dir.path().join("in.png");
    let grid = rasterpad::PixelGrid::filled(5, 5, Rgba([0, 255, 0, 255])).unwrap();
    io::save_grid(&grid, &input, 90).unwrap();

    let ops = dir.path().join("bad.txt");
    fs::write(&ops, "press 1\n").unwrap();
    let out = dir.path().join("out.png");
    let args = CliArgs::parse_from([
        "rasterpad",
        "--config",
        config.to_str().unwrap(),
        "-i",
        input.to_str().unwrap(),
        "--ops",
        ops.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);
    assert_eq!(cli::run(args), ExitCode::FAILURE);
    assert!(!out.exists());

    fs::write(&ops, "color primary red\npress 1 1\nrelease 3 1\n").unwrap();
    let args = CliArgs::parse_from([
        "rasterpad",
        "--config",
        config.to_str().unwrap(),
        "-i",
        input.to_str().unwrap(),
        "--ops",
        ops.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);
    assert_eq!(cli::run(args), ExitCode::SUCCESS);
    let result = io::load_grid(&out).unwrap();
    assert_eq!((result.width(), result.height()), (5, 5));
    assert_eq!(result.get_pixel(2, 1), Rgba([255, 0, 0, 255]));
    assert_eq!(result.get_pixel(2, 2), Rgba([0, 255, 0, 255]));
}
