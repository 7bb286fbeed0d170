use anyhow::{Context, Result, bail};
use std::io::{self, Write};
use std::ops::Range;
use std::{env, fs, path::PathBuf, process};
use textmarkup_config::Config;
use textmarkup_engine::editing::{ParsedText, TextChange};
use textmarkup_engine::parsing::{ParseBuffer, TraceBuffer, format_tree};
use textmarkup_minimark::formatting;

const USAGE: &str = "Usage: textmarkup-cli [--tree] [--rendered] [--stats] [--trace] \
                     [--edit <offset>:<len>:<text>] <file>";

#[derive(Debug, Default, PartialEq)]
struct Options {
    tree: bool,
    rendered: bool,
    stats: bool,
    trace: bool,
    edit: Option<Edit>,
    file: PathBuf,
}

impl Options {
    /// Rendered text is shown when no other view was asked for.
    fn show_rendered(&self) -> bool {
        self.rendered || !(self.tree || self.stats || self.trace)
    }
}

/// Replacement of a rendered byte range, given as `offset:len:text`. `\n` in
/// the text stands for a newline.
#[derive(Debug, PartialEq)]
struct Edit {
    range: Range<usize>,
    text: String,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    let mut file = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tree" => options.tree = true,
            "--rendered" => options.rendered = true,
            "--stats" => options.stats = true,
            "--trace" => options.trace = true,
            "--edit" => {
                let Some(value) = args.next() else {
                    bail!("--edit needs an <offset>:<len>:<text> argument");
                };
                options.edit = Some(parse_edit(&value)?);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            path => {
                if file.replace(PathBuf::from(path)).is_some() {
                    bail!("only one file can be given");
                }
            }
        }
    }
    let Some(file) = file else {
        bail!("no file given");
    };
    options.file = file;
    Ok(options)
}

fn parse_edit(value: &str) -> Result<Edit> {
    let mut parts = value.splitn(3, ':');
    let (Some(offset), Some(len), Some(text)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("edit {value:?} is not <offset>:<len>:<text>");
    };
    let offset: usize = offset
        .parse()
        .with_context(|| format!("bad edit offset {offset:?}"))?;
    let len: usize = len
        .parse()
        .with_context(|| format!("bad edit length {len:?}"))?;
    let end = offset
        .checked_add(len)
        .with_context(|| format!("edit range {offset}+{len} overflows"))?;
    Ok(Edit {
        range: offset..end,
        text: text.replace("\\n", "\n"),
    })
}

/// `RUST_LOG` wins over the config file, which wins over the `Info` default.
fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    }
    builder.parse_env(env_logger::Env::default());
    builder.init();
}

fn main() {
    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    init_logging(&config);
    log::debug!("Config path: {}", Config::config_path().display());

    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&options, &config) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(options: &Options, config: &Config) -> Result<()> {
    let content = fs::read_to_string(&options.file)
        .with_context(|| format!("Failed to read {}", options.file.display()))?;

    let tracing = options.trace || config.trace_rules;
    let grammar = textmarkup_minimark::grammar::build(tracing)?;
    let mut text = ParsedText::new(&content, grammar, formatting());
    if let Some(error) = text.buffer().last_error() {
        log::warn!("{}: {error}", options.file.display());
    }

    let mut out = io::stdout().lock();
    if let Some(edit) = &options.edit {
        let change = text.replace_characters(edit.range.clone(), &edit.text)?;
        write_change(&mut out, &change)?;
    }

    if options.tree
        && let Some(root) = text.buffer().tree()
    {
        writeln!(out, "{}", format_tree(text.raw_text(), root))?;
    }
    if options.show_rendered() {
        write!(out, "{}", text.rendered_text())?;
    }
    if options.stats || config.show_statistics {
        write_statistics(&mut out, text.buffer())?;
    }
    if tracing {
        match &config.trace_output {
            Some(path) => {
                let mut file = fs::File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_trace(&mut file, text.buffer())?;
                log::info!("Rule trace written to {}", path.display());
            }
            None => write_trace(&mut out, text.buffer())?,
        }
    }
    Ok(())
}

fn write_change(out: &mut impl Write, change: &TextChange) -> io::Result<()> {
    writeln!(
        out,
        "changed {:?} -> {:?} ({:+} bytes), attributes changed in {:?}",
        change.old_range,
        change.new_range(),
        change.change_in_length,
        change.changed_attributes_range
    )
}

fn write_statistics(out: &mut impl Write, buffer: &ParseBuffer) -> io::Result<()> {
    let grammar = buffer.grammar();
    writeln!(out, "{:<16} {:>10} {:>10}", "rule", "applied", "matched")?;
    for rule in grammar.rule_ids() {
        let Some(name) = grammar.name(rule) else {
            continue;
        };
        let stats = buffer.rule_statistics(rule);
        writeln!(
            out,
            "{name:<16} {:>10} {:>10}",
            stats.total_applications, stats.successes
        )?;
    }
    let memo = buffer.memo_statistics();
    writeln!(
        out,
        "memo: {} hits, {} misses, {} entries",
        memo.hits, memo.misses, memo.entries
    )
}

fn write_trace(out: &mut impl Write, buffer: &ParseBuffer) -> io::Result<()> {
    for entry in buffer.trace().map(TraceBuffer::entries).unwrap_or_default() {
        writeln!(out, "{entry}")?;
    }
    Ok(())
}
