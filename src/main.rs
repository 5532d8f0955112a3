use cecilio::app::StartupOptions;
use cecilio::i18n::Locale;
use cecilio::model::VisualMode;

fn main() -> anyhow::Result<()> {
    let options = parse_args(std::env::args().skip(1).collect())?;

    // A broken log file must not keep the player from starting.
    if let Err(err) = cecilio::logging::init() {
        eprintln!("logging disabled: {err:#}");
    }

    cecilio::app::run(options)
}

fn parse_args(args: Vec<String>) -> anyhow::Result<StartupOptions> {
    let mut out = StartupOptions::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--lang" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--lang requires en or ru");
                };
                let Some(locale) = Locale::parse(value) else {
                    anyhow::bail!("unknown language {value}");
                };
                out.locale = Some(locale);
            }
            "--mode" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--mode requires polygons, waves, stars or lines");
                };
                let Some(mode) = VisualMode::parse(value) else {
                    anyhow::bail!("unknown visual mode {value}");
                };
                out.visual_mode = Some(mode);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with("--") => anyhow::bail!("unknown argument {other}"),
            path => out.paths.push(path.to_string()),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Cecilio");
    println!("  cecilio [OPTIONS] [PATH|URL]...");
    println!("  --lang en|ru                       Interface language");
    println!("  --mode polygons|waves|stars|lines  Visualisation mode");
    println!("  -h, --help                         Show this help");
}
