use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::exit;

use blmx_common::{log, serde_json, Config};
use blmx_compiler::CompilerDriver;
use blmx_scenegraph::ShaderNodeTree;
use clap::{arg, builder::BoolishValueParser, Arg, ArgAction, Command};

fn load_tree(path: &Path) -> Result<(String, ShaderNodeTree), String> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let tree: ShaderNodeTree = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("cannot parse {}: {}", path.display(), e))?;
    let name = if tree.name.is_empty() {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("material"))
    } else {
        tree.name.clone()
    };
    Ok((name, tree))
}

fn main() {
    let mut cmd = Command::new("blmx")
        .about("Compiles Blender shader node trees to MaterialX")
        .arg(
            Arg::new("trees")
                .help("Shader node tree JSON files")
                .num_args(1..)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(arg!(-o --output <FILE> "Output .mtlx file. Default: stdout"))
        .arg(arg!(-c --config <FILE> "Config file"))
        .arg(arg!(--"image-cache" <DIR> "Directory for re-encoded images"))
        .arg(arg!(--"log-output" <FILE> "Redirects logging to a file"))
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Write the document as JSON instead of XML")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        );
    let help = cmd.render_help();
    let matches = cmd.get_matches();
    let trees: Vec<PathBuf> = matches
        .get_many::<PathBuf>("trees")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();
    if trees.is_empty() {
        println!("{}", help);
        exit(1);
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path).unwrap_or_else(|err| {
            eprintln!("failed to read config {}: {}", path, err);
            exit(1);
        }),
        None => Config::default(),
    };
    if let Some(dir) = matches.get_one::<String>("image-cache") {
        config.image_cache_dir = Some(PathBuf::from(dir));
    }
    if let Some(file) = matches.get_one::<String>("log-output") {
        config.log_output = file.clone();
    }
    if matches.get_one::<bool>("verbose").copied().unwrap_or(false) {
        config.log_level = String::from("debug");
    }
    if let Err(err) = blmx_common::init(&config) {
        eprintln!("failed to install logger: {}", err);
    }

    let mut inputs = vec![];
    for path in &trees {
        match load_tree(path) {
            Ok(tree) => inputs.push(tree),
            Err(err) => {
                log::error!("{}", err);
                exit(1);
            }
        }
    }

    let mut driver = CompilerDriver::new(&config);
    if let Err(err) = driver.compile_parallel(&inputs) {
        log::error!("{}", err);
        exit(1);
    }
    for material in driver.materials() {
        if material.material.is_none() {
            log::warn!("material `{}` produced no output", material.name);
        }
        if !material.diagnostics.is_empty() {
            log::info!(
                "material `{}`: {} warnings",
                material.name,
                material.diagnostics.len()
            );
        }
    }

    let document = driver.finish();
    let text = if matches.get_one::<bool>("json").copied().unwrap_or(false) {
        match serde_json::to_string_pretty(&document) {
            Ok(text) => text,
            Err(err) => {
                log::error!("{}", err);
                exit(1);
            }
        }
    } else {
        document.to_mtlx()
    };
    match matches.get_one::<String>("output") {
        Some(path) => {
            if let Err(err) = std::fs::write(path, text) {
                log::error!("failed to write {}: {}", path, err);
                exit(1);
            }
            log::info!("wrote {}", path);
        }
        None => print!("{}", text),
    }
}
