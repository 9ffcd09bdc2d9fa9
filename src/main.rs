use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use arbp::{compile, BuiltinStore, DirStore, Environment};

#[derive(Debug, Default, Clone)]
struct Cli {
    template: Option<String>,
    env_json: Option<PathBuf>,
    store_dir: Option<PathBuf>,
    list: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--template" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --template"));
                };
                cli.template = Some(v.clone());
                i += 2;
            }
            "--env" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --env"));
                };
                cli.env_json = Some(PathBuf::from(v));
                i += 2;
            }
            "--store" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --store"));
                };
                cli.store_dir = Some(PathBuf::from(v));
                i += 2;
            }
            "--list" => {
                cli.list = true;
                i += 1;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --template <name.prog>, \
                     --env <bindings.json>, --store <dir>, --list)"
                ));
            }
        }
    }
    Ok(cli)
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&args)?;

    if cli.list {
        for name in arbp::prog_templates::NAMES {
            println!("{name}");
        }
        return Ok(());
    }

    let Some(template) = cli.template else {
        return Err(anyhow!("missing --template <name.prog> (try --list)"));
    };

    let env = match &cli.env_json {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read --env file {}", path.display()))?;
            Environment::from_json_str(&text)
                .with_context(|| format!("invalid environment in {}", path.display()))?
        }
        None => Environment::new(),
    };

    let program = match &cli.store_dir {
        Some(dir) => {
            let store = DirStore::load(dir)?;
            compile(&store, &template, &env)
        }
        None => compile(&BuiltinStore, &template, &env),
    }
    .with_context(|| format!("failed to compile `{template}`"))?;

    // Program text on stdout, binding table on stderr, so the text can be
    // piped straight to a driver-loading tool.
    print!("{}", program.text);
    for binding in program.bindings() {
        eprintln!("[bind] {} {} -> slot {}", binding.kind, binding.name, binding.slot);
    }
    Ok(())
}
